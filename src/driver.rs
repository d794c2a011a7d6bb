use crate::{Address, Command, ControlCode, Error, OpCode, TimingEngine};

/// Bit and byte transport over a [`TimingEngine`].
///
/// Every operation blocks until the engine has finished the slot; slots
/// never overlap.
pub struct Driver<T: TimingEngine> {
    engine: T,
}

impl<T: TimingEngine> Driver<T> {
    pub fn new(engine: T) -> Self {
        Driver { engine }
    }

    /// Hands the timing engine back
    pub fn release(self) -> T {
        self.engine
    }

    pub fn engine(&self) -> &T {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut T {
        &mut self.engine
    }

    /// Sends a reset pulse and reports whether any device answered with a
    /// presence pulse
    pub fn reset(&mut self) -> Result<bool, Error<T::Error>> {
        let samples = self.engine.transact(ControlCode::Reset)?;
        Ok(T::is_presence(samples))
    }

    /// Reset that treats an empty bus as [`Error::NoPresence`]
    pub fn ensure_presence(&mut self) -> Result<(), Error<T::Error>> {
        if self.reset()? {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    /// Resets and addresses every device at once
    pub fn skip(&mut self) -> Result<(), Error<T::Error>> {
        self.ensure_presence()?;
        self.write_command(Command::SkipRom)?;
        Ok(())
    }

    /// Resets and addresses the single device with `addr`
    pub fn select(&mut self, addr: &Address) -> Result<(), Error<T::Error>> {
        self.ensure_presence()?;
        self.write_command(Command::MatchRom)?;
        self.write_bytes(addr.as_ref())?;
        Ok(())
    }

    pub fn reset_write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), Error<T::Error>> {
        self.ensure_presence()?;
        self.write_bytes(write)?;
        self.read_bytes(read)?;
        Ok(())
    }

    pub fn select_write_read(
        &mut self,
        addr: &Address,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<T::Error>> {
        self.select(addr)?;
        self.write_bytes(write)?;
        self.read_bytes(read)?;
        Ok(())
    }

    pub fn select_write_only(&mut self, addr: &Address, write: &[u8]) -> Result<(), Error<T::Error>> {
        self.select(addr)?;
        self.write_bytes(write)?;
        Ok(())
    }

    pub fn skip_write_only(&mut self, write: &[u8]) -> Result<(), Error<T::Error>> {
        self.skip()?;
        self.write_bytes(write)?;
        Ok(())
    }

    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), T::Error> {
        for d in dst {
            *d = self.read_byte()?;
        }
        Ok(())
    }

    /// Reads eight slots, least significant bit first
    pub fn read_byte(&mut self) -> Result<u8, T::Error> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit()? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    pub fn read_bit(&mut self) -> Result<bool, T::Error> {
        Ok(self.engine.transact(ControlCode::Read)? != 0)
    }

    pub fn write_command(&mut self, cmd: impl OpCode) -> Result<(), T::Error> {
        self.write_byte(cmd.op_code())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), T::Error> {
        for b in bytes {
            self.write_byte(*b)?;
        }
        Ok(())
    }

    /// Writes eight slots, least significant bit first
    pub fn write_byte(&mut self, byte: u8) -> Result<(), T::Error> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit((byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, high: bool) -> Result<(), T::Error> {
        // the completion token carries nothing
        self.engine.transact(ControlCode::write(high))?;
        Ok(())
    }
}
