//! Simulated bus for tests: a timing engine backed by a population of
//! virtual devices answering with wired-AND semantics.

use crate::{crc8, Address, ControlCode, TimingEngine};
use core::convert::Infallible;

const READ_SCRATCHPAD: u8 = 0xBE;
const CONVERT: u8 = 0x44;

struct SimDevice {
    address: Address,
    scratchpad: [u8; 9],
    active: bool,
}

#[derive(Default)]
struct ByteIn {
    value: u8,
    bits: u8,
}

impl ByteIn {
    /// Shifts in one bit, LSB first, returning the byte once complete
    fn push(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.value |= 1 << self.bits;
        }
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.value;
            *self = ByteIn::default();
            Some(byte)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SearchStep {
    Id,
    Complement,
    Direction,
}

enum Phase {
    Idle,
    RomCommand(ByteIn),
    Search { bit: u8, step: SearchStep },
    Match { bit: u8 },
    Function(ByteIn),
    Transmit { data: Vec<u8>, bit: usize },
}

/// Scratchpad of a DS18B20 at `raw` sixteenths of a degree, 12-bit resolution
pub fn scratchpad_for(raw: u16) -> [u8; 9] {
    let [lsb, msb] = raw.to_le_bytes();
    let mut scratchpad = [lsb, msb, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10, 0];
    scratchpad[8] = crc8(&scratchpad[..8]);
    scratchpad
}

/// Address with family `family`, the given serial and a correct CRC byte
pub fn rom(family: u8, serial: [u8; 6]) -> Address {
    let mut raw = [family, serial[0], serial[1], serial[2], serial[3], serial[4], serial[5], 0];
    raw[7] = crc8(&raw[..7]);
    Address::from(raw)
}

pub struct SimBus {
    devices: Vec<SimDevice>,
    phase: Phase,
    /// Search bit index from which every device stops answering
    dropout: Option<u8>,
    pub codes: Vec<ControlCode>,
    pub conversions: usize,
}

impl SimBus {
    pub fn new(addresses: &[Address]) -> Self {
        SimBus {
            devices: addresses
                .iter()
                .map(|address| SimDevice {
                    address: *address,
                    scratchpad: scratchpad_for(0x0550),
                    active: false,
                })
                .collect(),
            phase: Phase::Idle,
            dropout: None,
            codes: Vec::new(),
            conversions: 0,
        }
    }

    pub fn set_scratchpad(&mut self, address: &Address, scratchpad: [u8; 9]) {
        for device in self.devices.iter_mut().filter(|d| d.address == *address) {
            device.scratchpad = scratchpad;
        }
    }

    /// Devices go silent once a search pass reaches bit `bit`
    pub fn drop_out_at(&mut self, bit: u8) {
        self.dropout = Some(bit);
    }

    pub fn resets(&self) -> usize {
        self.codes.iter().filter(|c| **c == ControlCode::Reset).count()
    }

    /// Wired-AND over the active devices; the pull-up wins when none drive
    fn line(&self, f: impl Fn(&SimDevice) -> bool) -> bool {
        self.devices.iter().filter(|d| d.active).all(f)
    }

    fn rom_bit(address: &Address, bit: u8) -> bool {
        address[(bit / 8) as usize] & (1 << (bit % 8)) != 0
    }

    fn read(&mut self) -> bool {
        match &mut self.phase {
            Phase::Search { bit, step } => {
                let (bit, step) = (*bit, *step);
                if self.dropout.map_or(false, |d| bit >= d) {
                    return true;
                }
                match step {
                    SearchStep::Id => {
                        self.phase = Phase::Search { bit, step: SearchStep::Complement };
                        self.line(|d| Self::rom_bit(&d.address, bit))
                    }
                    SearchStep::Complement => {
                        self.phase = Phase::Search { bit, step: SearchStep::Direction };
                        self.line(|d| !Self::rom_bit(&d.address, bit))
                    }
                    SearchStep::Direction => true,
                }
            }
            Phase::Transmit { data, bit } => {
                let index = *bit;
                *bit += 1;
                match data.get(index / 8) {
                    Some(byte) => byte & (1 << (index % 8)) != 0,
                    None => true,
                }
            }
            _ => true,
        }
    }

    fn write(&mut self, value: bool) {
        let phase = core::mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match phase {
            Phase::RomCommand(mut byte) => match byte.push(value) {
                Some(0xF0) => Phase::Search { bit: 0, step: SearchStep::Id },
                Some(0x55) => Phase::Match { bit: 0 },
                Some(0xCC) => Phase::Function(ByteIn::default()),
                Some(0x33) => Phase::Transmit {
                    data: self.wired_and(|d| d.address.as_ref()),
                    bit: 0,
                },
                Some(_) => Phase::Idle,
                None => Phase::RomCommand(byte),
            },
            Phase::Search { bit, step: SearchStep::Direction } => {
                for device in self.devices.iter_mut() {
                    if Self::rom_bit(&device.address, bit) != value {
                        device.active = false;
                    }
                }
                if bit + 1 == Address::BITS {
                    Phase::Function(ByteIn::default())
                } else {
                    Phase::Search { bit: bit + 1, step: SearchStep::Id }
                }
            }
            Phase::Match { bit } => {
                for device in self.devices.iter_mut() {
                    if Self::rom_bit(&device.address, bit) != value {
                        device.active = false;
                    }
                }
                if bit + 1 == Address::BITS {
                    Phase::Function(ByteIn::default())
                } else {
                    Phase::Match { bit: bit + 1 }
                }
            }
            Phase::Function(mut byte) => match byte.push(value) {
                Some(READ_SCRATCHPAD) => Phase::Transmit {
                    data: self.wired_and(|d| &d.scratchpad[..]),
                    bit: 0,
                },
                Some(CONVERT) => {
                    self.conversions += 1;
                    Phase::Idle
                }
                Some(_) => Phase::Idle,
                None => Phase::Function(byte),
            },
            // a write out of sequence breaks the conversation
            Phase::Search { .. } => Phase::Idle,
            other => other,
        };
    }

    fn wired_and<'a>(&'a self, bytes: impl Fn(&'a SimDevice) -> &'a [u8]) -> Vec<u8> {
        let mut active = self.devices.iter().filter(|d| d.active).map(bytes);
        let first = match active.next() {
            Some(first) => first.to_vec(),
            None => return Vec::new(),
        };
        active.fold(first, |mut acc, next| {
            for (a, b) in acc.iter_mut().zip(next) {
                *a &= *b;
            }
            acc
        })
    }
}

impl TimingEngine for SimBus {
    type Error = Infallible;

    const PRESENCE_SAMPLES: u32 = 24;

    fn transact(&mut self, code: ControlCode) -> Result<u32, Infallible> {
        self.codes.push(code);
        Ok(match code {
            ControlCode::Reset => {
                for device in self.devices.iter_mut() {
                    device.active = true;
                }
                self.phase = Phase::RomCommand(ByteIn::default());
                if self.devices.is_empty() {
                    Self::no_presence_word()
                } else {
                    // devices hold the line low for the middle of the window
                    0x00FF_000F
                }
            }
            ControlCode::Read => self.read().into(),
            ControlCode::Write0 => {
                self.write(false);
                0
            }
            ControlCode::Write1 => {
                self.write(true);
                0
            }
        })
    }
}
