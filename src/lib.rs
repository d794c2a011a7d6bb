#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

mod address;
mod bitbang;
mod command;
mod crc;
mod device;
mod directory;
mod driver;
#[cfg(feature = "ds18b20")]
pub mod ds18b20;
mod engine;
mod iowire;
mod result;
mod search;
mod sensor;
#[cfg(test)]
mod sim;

pub use address::{Address, AddressError};
pub use bitbang::{BitBangEngine, BitBangError};
pub use command::{Command, OpCode};
pub use crc::{check_crc8, compute_partial_crc8, crc8, ensure_crc8};
pub use device::Device;
pub use directory::{Directory, ScanReport};
pub use driver::Driver;
pub use engine::{ControlCode, TimingEngine};
pub use iowire::{Inverted, IoWire};
pub use result::Error;
pub use search::{DeviceSearchIter, SearchState};
pub use sensor::Sensor;
