use crate::{ControlCode, IoWire, TimingEngine};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Software timing engine driving a standard-speed bus from one GPIO line.
///
/// Interrupts should be masked around each [`transact`](TimingEngine::transact)
/// call if the platform can preempt for longer than a few microseconds.
pub struct BitBangEngine<W: IoWire, D: DelayNs> {
    wire: W,
    delay: D,
}

#[derive(Debug)]
pub enum BitBangError<E: Debug> {
    /// Wire did not float high before the reset pulse, likely shorted
    WireFault,
    Pin(E),
}

impl<E: Debug> From<E> for BitBangError<E> {
    fn from(e: E) -> Self {
        BitBangError::Pin(e)
    }
}

impl<W: IoWire, D: DelayNs> BitBangEngine<W, D> {
    pub fn new(wire: W, delay: D) -> Self {
        BitBangEngine { wire, delay }
    }

    pub fn release(self) -> (W, D) {
        (self.wire, self.delay)
    }

    fn reset(&mut self) -> Result<u32, BitBangError<W::Error>> {
        self.wire.set_high()?;
        self.ensure_wire_high()?;
        self.wire.set_low()?;
        self.delay.delay_us(480);
        self.wire.set_high()?;

        let mut samples = 0_u32;
        for i in 0..Self::PRESENCE_SAMPLES {
            self.delay.delay_us(10);
            if self.wire.is_high()? {
                samples |= 1 << i;
            }
        }
        self.delay.delay_us(410);
        Ok(samples)
    }

    fn ensure_wire_high(&mut self) -> Result<(), BitBangError<W::Error>> {
        for _ in 0..125 {
            if self.wire.is_high()? {
                return Ok(());
            }
            self.delay.delay_us(2);
        }
        Err(BitBangError::WireFault)
    }

    fn read_slot(&mut self) -> Result<bool, W::Error> {
        self.wire.set_low()?;
        self.delay.delay_us(3);
        self.wire.set_high()?;
        self.delay.delay_us(2);
        let val = self.wire.is_high();
        self.delay.delay_us(61);
        val
    }

    fn write_slot(&mut self, high: bool) -> Result<(), W::Error> {
        self.wire.set_low()?;
        self.delay.delay_us(if high { 10 } else { 65 });
        self.wire.set_high()?;
        self.delay.delay_us(if high { 55 } else { 5 });
        Ok(())
    }
}

impl<W: IoWire, D: DelayNs> TimingEngine for BitBangEngine<W, D> {
    type Error = BitBangError<W::Error>;

    /// Seven samples 10 us apart, starting 10 us after the line is released
    const PRESENCE_SAMPLES: u32 = 7;

    fn transact(&mut self, code: ControlCode) -> Result<u32, Self::Error> {
        match code {
            ControlCode::Reset => self.reset(),
            ControlCode::Read => Ok(self.read_slot()?.into()),
            ControlCode::Write0 => self.write_slot(false).map(|_| 0).map_err(Into::into),
            ControlCode::Write1 => self.write_slot(true).map(|_| 0).map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BitBangEngine, BitBangError};
    use crate::{ControlCode, Driver, TimingEngine};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    fn reset_prologue() -> Vec<Transaction> {
        vec![
            Transaction::set(State::High),
            Transaction::get(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]
    }

    #[test]
    fn reset_packs_presence_samples() {
        let mut expectations = reset_prologue();
        for level in [
            State::High,
            State::Low,
            State::Low,
            State::Low,
            State::High,
            State::High,
            State::High,
        ] {
            expectations.push(Transaction::get(level));
        }
        let mut engine = BitBangEngine::new((PinMock::new(&expectations),), NoopDelay::new());

        let word = engine.transact(ControlCode::Reset).unwrap();
        assert_eq!(word, 0b111_0001);
        assert!(BitBangEngine::<(PinMock,), NoopDelay>::is_presence(word));

        let (mut wire, _) = engine.release();
        wire.0.done();
    }

    #[test]
    fn idle_bus_reports_no_presence() {
        let mut expectations = reset_prologue();
        expectations.extend((0..7).map(|_| Transaction::get(State::High)));
        let engine = BitBangEngine::new((PinMock::new(&expectations),), NoopDelay::new());
        let mut driver = Driver::new(engine);

        assert!(!driver.reset().unwrap());

        let (mut wire, _) = driver.release().release();
        wire.0.done();
    }

    #[test]
    fn shorted_wire_is_a_fault() {
        let mut expectations = vec![Transaction::set(State::High)];
        expectations.extend((0..125).map(|_| Transaction::get(State::Low)));
        let mut engine = BitBangEngine::new((PinMock::new(&expectations),), NoopDelay::new());

        assert!(matches!(
            engine.transact(ControlCode::Reset),
            Err(BitBangError::WireFault)
        ));

        let (mut wire, _) = engine.release();
        wire.0.done();
    }

    #[test]
    fn slots_toggle_the_line() {
        let expectations = [
            // write 1
            Transaction::set(State::Low),
            Transaction::set(State::High),
            // write 0
            Transaction::set(State::Low),
            Transaction::set(State::High),
            // read, device holds the line low
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::get(State::Low),
            // read, line floats high
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::get(State::High),
        ];
        let mut engine = BitBangEngine::new((PinMock::new(&expectations),), NoopDelay::new());

        engine.transact(ControlCode::Write1).unwrap();
        engine.transact(ControlCode::Write0).unwrap();
        assert_eq!(engine.transact(ControlCode::Read).unwrap(), 0);
        assert_ne!(engine.transact(ControlCode::Read).unwrap(), 0);

        let (mut wire, _) = engine.release();
        wire.0.done();
    }
}
