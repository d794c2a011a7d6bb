use crate::{Device, Driver, Error, TimingEngine};

pub trait Sensor: Device {
    /// returns the milliseconds required to wait until the measurement finished
    fn start_measurement<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<u16, Error<T::Error>>;

    /// returns the measured value
    fn read_measurement<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<f32, Error<T::Error>>;

    fn read_measurement_raw<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<u16, Error<T::Error>>;
}
