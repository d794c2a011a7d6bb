use crate::{Address, Driver, Error, SearchState, TimingEngine};
use heapless::Vec;
use log::{debug, warn};

/// Outcome of a [`Directory::refresh`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanReport {
    /// Devices now in the directory
    pub found: usize,
    /// Addresses dropped for a CRC mismatch
    pub crc_rejected: usize,
    /// The bus held more devices than the directory can
    pub overflowed: bool,
}

/// Up to `N` validated device addresses in ascending order, rebuilt by every
/// bus scan.
#[derive(Debug, Clone)]
pub struct Directory<const N: usize> {
    devices: Vec<Address, N>,
}

impl<const N: usize> Default for Directory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Directory<N> {
    pub const fn new() -> Self {
        Directory { devices: Vec::new() }
    }

    /// Replaces the contents with the devices currently on the bus.
    ///
    /// Addresses failing their CRC are skipped. Scanning stops once `N`
    /// devices are collected and another one shows up. Whatever was
    /// collected is sorted by its 64-bit value even when the engine fails
    /// mid-scan.
    pub fn refresh<T: TimingEngine>(&mut self, driver: &mut Driver<T>) -> Result<ScanReport, Error<T::Error>> {
        self.devices.clear();
        let mut report = ScanReport::default();
        let outcome = self.collect(driver, &mut report);
        self.devices.sort_unstable();
        report.found = self.devices.len();
        outcome?;

        debug!(
            "scan complete: {} device(s), {} rejected",
            report.found, report.crc_rejected
        );
        Ok(report)
    }

    fn collect<T: TimingEngine>(
        &mut self,
        driver: &mut Driver<T>,
        report: &mut ScanReport,
    ) -> Result<(), Error<T::Error>> {
        let mut search = SearchState::new();
        while let Some(address) = driver.search_next(&mut search)? {
            if !address.is_valid() {
                warn!("CRC mismatch in address {}, skipped", address);
                report.crc_rejected += 1;
                continue;
            }
            if self.devices.push(address).is_err() {
                warn!("more than {} devices on the bus, scan stopped", N);
                report.overflowed = true;
                break;
            }
            debug!("found device {}", address);
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.devices.len()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Address at `index`, `None` past the end
    pub fn get(&self, index: usize) -> Option<Address> {
        self.devices.get(index).copied()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.devices.binary_search(address).is_ok()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Address> {
        self.devices.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.devices
    }
}

impl<'a, const N: usize> IntoIterator for &'a Directory<N> {
    type Item = &'a Address;
    type IntoIter = core::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
