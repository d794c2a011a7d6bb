use crate::{Address, Driver, Error, TimingEngine};
use core::fmt::Debug;

/// Generic device interface
pub trait Device: Sized {
    /// Device family code
    const FAMILY_CODE: u8;

    /// Get device address
    fn address(&self) -> &Address;

    /// Instantiate device using address without checking the family code
    fn from_address_unchecked(address: Address) -> Self;

    /// Instantiate device from address
    fn from_address<E: Sized + Debug>(address: Address) -> Result<Self, Error<E>> {
        if address.family_code() != Self::FAMILY_CODE {
            Err(Error::FamilyCodeMismatch(
                Self::FAMILY_CODE,
                address.family_code(),
            ))
        } else {
            Ok(Self::from_address_unchecked(address))
        }
    }

    /// First device of this family found by a bus search, skipping
    /// addresses with a bad CRC
    fn search_first<T: TimingEngine>(driver: &mut Driver<T>) -> Result<Option<Self>, Error<T::Error>> {
        for address in driver.search() {
            let address = address?;
            if address.family_code() == Self::FAMILY_CODE && address.is_valid() {
                return Ok(Some(Self::from_address_unchecked(address)));
            }
        }
        Ok(None)
    }

    /// The only device on a single-drop bus
    fn get_single<T: TimingEngine>(driver: &mut Driver<T>) -> Result<Self, Error<T::Error>> {
        let address = Address::get_single(driver)?;
        Self::from_address(address)
    }
}
