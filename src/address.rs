use crate::{check_crc8, ensure_crc8, Command, Driver, Error, OpCode, TimingEngine};
use byteorder::{ByteOrder, LittleEndian};
use core::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
    str::FromStr,
};

/// 64-bit device ROM: family code, 48-bit serial number, CRC8 of the first
/// seven bytes. Byte 0 goes on the wire first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Address {
    raw: [u8; Self::BYTES as usize],
}

impl Default for Address {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for Address {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }
}

impl From<Address> for [u8; Address::BYTES as usize] {
    fn from(addr: Address) -> [u8; Address::BYTES as usize] {
        addr.raw
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        let mut raw = [0; Self::BYTES as usize];
        LittleEndian::write_u64(&mut raw, value);
        Address { raw }
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> u64 {
        addr.to_u64()
    }
}

impl Deref for Address {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl DerefMut for Address {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.raw
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl AsMut<[u8]> for Address {
    fn as_mut(&mut self) -> &mut [u8] {
        self.deref_mut() as _
    }
}

/// Ordered by the 64-bit value with the family code as least significant byte
impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u64().cmp(&other.to_u64())
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Address {
    /// The length of device address in bytes
    pub const BYTES: u8 = 8;

    /// The length of device address in bits
    pub const BITS: u8 = Self::BYTES * 8;

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn serial_number(&self) -> [u8; 6] {
        let mut serial = [0; 6];
        serial.copy_from_slice(&self[1..7]);
        serial
    }

    pub fn crc(&self) -> u8 {
        self[7]
    }

    /// Whether the trailing byte is the CRC8 of family code and serial number
    pub fn is_valid(&self) -> bool {
        check_crc8(&self[..7], self.crc())
    }

    pub fn to_u64(&self) -> u64 {
        LittleEndian::read_u64(&self.raw)
    }

    pub fn ensure_correct_crc8<E: Debug>(&self) -> Result<(), Error<E>> {
        ensure_crc8(&self[..7], self.crc())
    }
}

/// Error type
#[derive(Debug, PartialEq, Eq)]
pub enum AddressError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = Address::default();
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for i in 0..Self::BYTES as usize {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        addr[i] = (h << 4) | l;
                    }
                    _ => return Err(AddressError::Invalid),
                },
                _ => return Err(AddressError::NotEnough),
            }
        }

        Ok(addr)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}

impl Address {
    /// Reads the address of the only device on a single-drop bus.
    ///
    /// With more than one device attached the answers collide and the CRC
    /// check fails.
    pub fn read_single<T: TimingEngine>(&mut self, driver: &mut Driver<T>) -> Result<(), Error<T::Error>> {
        driver.reset_write_read(&[Command::ReadRom.op_code()], self.as_mut())?;
        self.ensure_correct_crc8()
    }

    pub fn get_single<T: TimingEngine>(driver: &mut Driver<T>) -> Result<Self, Error<T::Error>> {
        let mut address = Self::default();
        address.read_single(driver)?;
        Ok(address)
    }
}
