use core::fmt::Debug;

/// Control codes understood by a timing engine, one per bus time slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlCode {
    /// Reset pulse followed by the presence sampling window
    Reset = 0b0001,
    /// Read time slot
    Read = 0b0011,
    /// Write-0 time slot
    Write0 = 0b0111,
    /// Write-1 time slot
    Write1 = 0b1111,
}

impl ControlCode {
    pub fn write(bit: bool) -> Self {
        if bit {
            ControlCode::Write1
        } else {
            ControlCode::Write0
        }
    }

    /// The 4-bit word pushed to the engine
    pub fn bits(self) -> u8 {
        self as _
    }
}

/// The waveform generator behind a [`Driver`](crate::Driver).
///
/// Implementations own the bus timing: a programmable I/O state machine, a
/// bridge chip, or [`BitBangEngine`](crate::BitBangEngine) on a plain pin.
/// Each call to [`transact`](TimingEngine::transact) blocks until the slot
/// has completed on the wire.
pub trait TimingEngine {
    type Error: Debug;

    /// Number of line samples packed into the reset response word, LSB first
    const PRESENCE_SAMPLES: u32;

    /// Runs one time slot and returns the engine's response word.
    ///
    /// * `Reset`: presence window samples, bit set = line high
    /// * `Read`: sampled level, zero for low
    /// * `Write0`/`Write1`: completion token, no meaning
    fn transact(&mut self, code: ControlCode) -> Result<u32, Self::Error>;

    /// Reset response of an idle bus: every sample in the window high
    fn no_presence_word() -> u32 {
        match Self::PRESENCE_SAMPLES {
            0 => 0,
            n if n >= u32::BITS => u32::MAX,
            n => (1 << n) - 1,
        }
    }

    /// Whether a reset response shows any device pulling the line low
    fn is_presence(word: u32) -> bool {
        let mask = Self::no_presence_word();
        word & mask != mask
    }
}
