use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// The data line as seen by [`BitBangEngine`](crate::BitBangEngine)
pub trait IoWire {
    type Error: Error;

    /// Is the input pin high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Is the input pin low?
    fn is_low(&mut self) -> Result<bool, Self::Error>;

    /// Drives the pin low
    ///
    /// *NOTE* the actual electrical state of the pin may not actually be low, e.g. due to external
    /// electrical sources
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Releases the pin, letting the pull-up take the line high
    ///
    /// *NOTE* with an open-drain pin another device may still hold the line low
    fn set_high(&mut self) -> Result<(), Self::Error>;
}

/// Single open-drain pin
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Separate sense and drive pins
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}

/// Pin wrapper for lines behind an inverting buffer or transistor driver
pub struct Inverted<P>(pub P);

impl<I: ErrorType> ErrorType for Inverted<I> {
    type Error = I::Error;
}

impl<I> InputPin for Inverted<I>
where
    I: InputPin,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

impl<O> OutputPin for Inverted<O>
where
    O: OutputPin,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}
