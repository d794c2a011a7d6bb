use core::fmt::Debug;

/// Error type
#[derive(Debug)]
pub enum Error<E: Sized + Debug> {
    /// No presence pulse after a reset that had to address a device
    NoPresence,
    /// Computed and stored CRC8 differ
    CrcMismatch(u8, u8),
    /// Expected and found family code
    FamilyCodeMismatch(u8, u8),
    Engine(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Engine(e)
    }
}
