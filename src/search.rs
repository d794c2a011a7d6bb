use crate::{Address, Command, Driver, Error, TimingEngine};
use log::trace;

/// Progress of an enumeration across search passes.
///
/// A fresh value starts at the beginning of the ROM tree; each pass through
/// [`Driver::search_next`] walks one branch and remembers where to turn next.
/// Positions are 1-based bit numbers, 0 meaning "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    address: [u8; 8],
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    last_device: bool,
}

impl SearchState {
    pub fn new() -> SearchState {
        SearchState::default()
    }

    /// Forgets every previous pass
    pub fn reset(&mut self) {
        *self = SearchState::default();
    }

    /// Position where the last pass took the 0 branch with a 1 branch pending
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Same as [`last_discrepancy`](Self::last_discrepancy) within the family code
    pub fn last_family_discrepancy(&self) -> u8 {
        self.last_family_discrepancy
    }

    /// Whether the last device has already been returned
    pub fn is_exhausted(&self) -> bool {
        self.last_device
    }

    fn is_bit_set_in_address(&self, bit: u8) -> bool {
        self.address[(bit / 8) as usize] & (0x01 << (bit % 8)) != 0x00
    }

    fn write_bit_in_address(&mut self, bit: u8, value: bool) {
        let index = (bit / 8) as usize;
        let mask = 0x01 << (bit % 8);
        if value {
            self.address[index] |= mask;
        } else {
            self.address[index] &= !mask;
        }
    }

    /// Direction to take at `id_bit_number` where the devices disagree
    fn branch(&self, id_bit_number: u8) -> bool {
        if id_bit_number < self.last_discrepancy {
            // replay the prefix of the previous pass
            self.is_bit_set_in_address(id_bit_number - 1)
        } else {
            // turn at the last discrepancy, take 0 at new ones
            id_bit_number == self.last_discrepancy
        }
    }
}

/// Iterator over every address on the bus, one search pass per item.
///
/// Ends after the last device or when a pass finds no one answering.
pub struct DeviceSearchIter<'a, T: TimingEngine> {
    search: Option<SearchState>,
    driver: &'a mut Driver<T>,
}

impl<T: TimingEngine> Iterator for DeviceSearchIter<'_, T> {
    type Item = Result<Address, Error<T::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut search = self.search.take()?;
        let result = self.driver.search_next(&mut search).transpose()?;
        if result.is_ok() {
            self.search = Some(search);
        }
        Some(result)
    }
}

impl<T: TimingEngine> Driver<T> {
    /// Enumerates the bus from scratch
    pub fn search(&mut self) -> DeviceSearchIter<'_, T> {
        self.search_from(SearchState::new())
    }

    /// Continues an enumeration from a saved state
    pub fn search_from(&mut self, search: SearchState) -> DeviceSearchIter<'_, T> {
        DeviceSearchIter {
            search: Some(search),
            driver: self,
        }
    }

    /// Runs one search pass and returns the next address, or `None` when the
    /// enumeration is over.
    ///
    /// An empty bus, a pass where every device stopped answering, and an
    /// all-zero family code all end the enumeration and leave `search` as
    /// fresh as [`SearchState::new`]. The address CRC is not checked here.
    pub fn search_next(&mut self, search: &mut SearchState) -> Result<Option<Address>, Error<T::Error>> {
        if search.last_device {
            trace!("search exhausted");
            search.reset();
            return Ok(None);
        }

        if !self.reset()? {
            trace!("no presence pulse, search restarts");
            search.reset();
            return Ok(None);
        }

        self.write_command(Command::SearchRom)?;

        let mut last_zero = 0;
        for id_bit_number in 1..=Address::BITS {
            let id_bit = self.read_bit()?;
            let cmp_id_bit = self.read_bit()?;

            let direction = match (id_bit, cmp_id_bit) {
                (true, true) => {
                    trace!("no response at bit {}, search restarts", id_bit_number);
                    search.reset();
                    return Ok(None);
                }
                (false, false) => {
                    let direction = search.branch(id_bit_number);
                    if !direction {
                        last_zero = id_bit_number;
                        if last_zero < 9 {
                            search.last_family_discrepancy = last_zero;
                        }
                    }
                    direction
                }
                // every remaining device agrees
                (id_bit, _) => id_bit,
            };

            search.write_bit_in_address(id_bit_number - 1, direction);
            self.write_bit(direction)?;
        }

        search.last_discrepancy = last_zero;
        search.last_device = last_zero == 0;

        let address = Address::from(search.address);
        if address.family_code() == 0 {
            trace!("zero family code, search restarts");
            search.reset();
            return Ok(None);
        }
        Ok(Some(address))
    }
}
