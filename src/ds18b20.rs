use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;
use log::warn;

use crate::{check_crc8, ensure_crc8, Address, Device, Directory, Driver, Error, OpCode, Sensor, TimingEngine};

#[derive(Clone, Copy, Debug)]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    WriteScratchpad = 0x4e,
    ReadScratchpad = 0xBE,
    CopyScratchpad = 0x48,
    RecallE2 = 0xB8,
    ReadPowerSupply = 0xB4,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasureResolution {
    TC8 = 0b0001_1111,
    TC4 = 0b0011_1111,
    TC2 = 0b0101_1111,
    TC = 0b0111_1111,
}

impl MeasureResolution {
    pub fn time_ms(&self) -> u16 {
        match self {
            MeasureResolution::TC8 => 94,
            MeasureResolution::TC4 => 188,
            MeasureResolution::TC2 => 375,
            MeasureResolution::TC => 750,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            MeasureResolution::TC8 => 9,
            MeasureResolution::TC4 => 10,
            MeasureResolution::TC2 => 11,
            MeasureResolution::TC => 12,
        }
    }

    /// Decodes the R1/R0 bits of the configuration register
    pub fn from_config(config: u8) -> Self {
        match config & 0b0110_0000 {
            0b0000_0000 => MeasureResolution::TC8,
            0b0010_0000 => MeasureResolution::TC4,
            0b0100_0000 => MeasureResolution::TC2,
            _ => MeasureResolution::TC,
        }
    }
}

/// Snapshot of the nine scratchpad bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl AsRef<[u8]> for Scratchpad {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    /// Temperature register in sixteenths of a degree, two's complement
    pub fn raw_temperature(&self) -> u16 {
        LittleEndian::read_u16(&self.raw[0..2])
    }

    pub fn high_alarm(&self) -> i8 {
        self.raw[2] as i8
    }

    pub fn low_alarm(&self) -> i8 {
        self.raw[3] as i8
    }

    pub fn configuration(&self) -> u8 {
        self.raw[4]
    }

    pub fn resolution(&self) -> MeasureResolution {
        MeasureResolution::from_config(self.configuration())
    }

    pub fn crc(&self) -> u8 {
        self.raw[8]
    }

    /// Whether the trailing CRC8 matches the first eight bytes
    pub fn is_valid(&self) -> bool {
        check_crc8(&self.raw[..8], self.crc())
    }

    pub fn ensure_correct_crc8<E: core::fmt::Debug>(&self) -> Result<(), Error<E>> {
        ensure_crc8(&self.raw[..8], self.crc())
    }

    pub fn temperature(&self) -> f32 {
        decode_temperature(self)
    }
}

/// Degrees Celsius from the scratchpad temperature register
pub fn decode_temperature(scratchpad: &Scratchpad) -> f32 {
    let raw = scratchpad.raw_temperature() as i16;
    let magnitude = raw.unsigned_abs();
    let integer = (magnitude >> 4) as f32;
    let fraction = (magnitude & 0xF) as f32 / 16.0;
    if raw < 0 {
        -(integer + fraction)
    } else {
        integer + fraction
    }
}

/// Starts a conversion on every device at once. The results are ready after
/// the conversion time of the slowest configured resolution.
pub fn start_conversion<T: TimingEngine>(driver: &mut Driver<T>) -> Result<(), Error<T::Error>> {
    driver.skip_write_only(&[Command::Convert.op_code()])
}

/// Reads the scratchpad of `address`.
///
/// A scratchpad failing its CRC is logged and returned as
/// [`Error::CrcMismatch`]. A device that did not answer reads as all ones and
/// fails the same way.
pub fn read_scratchpad<T: TimingEngine>(
    driver: &mut Driver<T>,
    address: &Address,
) -> Result<Scratchpad, Error<T::Error>> {
    let mut raw = [0u8; Scratchpad::BYTES];
    driver.select_write_read(address, &[Command::ReadScratchpad.op_code()], &mut raw[..])?;
    let scratchpad = Scratchpad::from(raw);
    if let Err(e) = scratchpad.ensure_correct_crc8() {
        warn!("CRC mismatch in scratchpad of {}", address);
        return Err(e);
    }
    Ok(scratchpad)
}

/// Last converted temperature of `address`
pub fn read_temperature<T: TimingEngine>(
    driver: &mut Driver<T>,
    address: &Address,
) -> Result<f32, Error<T::Error>> {
    let scratchpad = read_scratchpad(driver, address)?;
    Ok(decode_temperature(&scratchpad))
}

/// One read cycle over the directory: convert on all devices, wait, then read
/// each device in directory order. Readings with a bad CRC come back as
/// `None`.
pub fn measure_all<T: TimingEngine, const N: usize>(
    driver: &mut Driver<T>,
    directory: &Directory<N>,
    delay: &mut impl DelayNs,
    resolution: MeasureResolution,
) -> Result<heapless::Vec<(Address, Option<f32>), N>, Error<T::Error>> {
    let mut readings = heapless::Vec::new();
    if directory.is_empty() {
        return Ok(readings);
    }

    start_conversion(driver)?;
    delay.delay_ms(resolution.time_ms().into());

    for address in directory {
        let reading = match read_scratchpad(driver, address) {
            Ok(scratchpad) => Some(decode_temperature(&scratchpad)),
            Err(Error::CrcMismatch(..)) => None,
            Err(e) => return Err(e),
        };
        if readings.push((*address, reading)).is_err() {
            break;
        }
    }
    Ok(readings)
}

#[derive(Debug, Clone, Copy)]
pub struct Ds18b20 {
    address: Address,
    resolution: MeasureResolution,
}

impl From<Ds18b20> for Address {
    fn from(device: Ds18b20) -> Self {
        device.address
    }
}

impl Ds18b20 {
    /// Resolution assumed when waiting for conversions
    pub fn with_resolution(mut self, resolution: MeasureResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn resolution(&self) -> MeasureResolution {
        self.resolution
    }

    pub fn measure_temperature<T: TimingEngine>(
        &self,
        driver: &mut Driver<T>,
    ) -> Result<MeasureResolution, Error<T::Error>> {
        driver.select_write_only(&self.address, &[Command::Convert.op_code()])?;
        Ok(self.resolution)
    }

    pub fn read_scratchpad<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<Scratchpad, Error<T::Error>> {
        read_scratchpad(driver, &self.address)
    }

    pub fn read_temperature<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<u16, Error<T::Error>> {
        Ok(self.read_scratchpad(driver)?.raw_temperature())
    }
}

impl Device for Ds18b20 {
    const FAMILY_CODE: u8 = 0x28;

    fn address(&self) -> &Address {
        &self.address
    }

    fn from_address_unchecked(address: Address) -> Self {
        Self {
            address,
            resolution: MeasureResolution::TC,
        }
    }
}

impl Sensor for Ds18b20 {
    fn start_measurement<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<u16, Error<T::Error>> {
        Ok(self.measure_temperature(driver)?.time_ms())
    }

    fn read_measurement<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<f32, Error<T::Error>> {
        read_temperature(driver, &self.address)
    }

    fn read_measurement_raw<T: TimingEngine>(&self, driver: &mut Driver<T>) -> Result<u16, Error<T::Error>> {
        self.read_temperature(driver)
    }
}

/// Split raw u16 value to two parts: integer and fraction N
/// Original value may be calculated as: integer + fraction/10000
pub fn split_temp(temperature: u16) -> (i16, i16) {
    if temperature < 0x8000 {
        (temperature as i16 >> 4, (temperature as i16 & 0xF) * 625)
    } else {
        let abs = (temperature as i16).unsigned_abs();
        (-((abs >> 4) as i16), -625 * (abs & 0xF) as i16)
    }
}
