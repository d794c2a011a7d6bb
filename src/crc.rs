//! Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, bit-reflected), table driven.
//!
//! Every 64-bit device address and every DS18B20 scratchpad ends with this
//! checksum over the preceding bytes.

use crate::Error;
use core::fmt::Debug;

/// Reflected form of `0x31`
const POLYNOMIAL: u8 = 0x8C;

static TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Continues a CRC-8 computation from `crc` over `data`
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    data.iter()
        .fold(crc, |crc, byte| TABLE[(crc ^ byte) as usize])
}

/// CRC-8 of `data` with a zero seed
pub fn crc8(data: &[u8]) -> u8 {
    compute_partial_crc8(0, data)
}

/// Whether `crc` is the checksum of `data`
pub fn check_crc8(data: &[u8], crc: u8) -> bool {
    crc8(data) == crc
}

/// Like [`check_crc8`], reporting a mismatch as `Error::CrcMismatch(computed, stored)`
pub fn ensure_crc8<E: Debug>(data: &[u8], crc: u8) -> Result<(), Error<E>> {
    let computed = crc8(data);
    if computed != crc {
        Err(Error::CrcMismatch(computed, crc))
    } else {
        Ok(())
    }
}
