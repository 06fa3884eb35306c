//! Battery-backed SRAM image.
//!
//! The blob is owned by the system settings code; the expansion interface
//! only reads the fields that go into a freshly formatted memory card and
//! writes the bytes back verbatim at shutdown.
//!
//! Layout (big-endian):
//!
//! | Offset | Size | Field              |
//! |--------|------|--------------------|
//! | 0x00   | 4    | RTC                |
//! | 0x04   | 2    | Checksum           |
//! | 0x06   | 2    | Inverse checksum   |
//! | 0x08   | 8    | EAD0, EAD1         |
//! | 0x10   | 4    | RTC bias           |
//! | 0x14   | 1    | VI horizontal pos  |
//! | 0x15   | 1    | NTD                |
//! | 0x16   | 1    | Language           |
//! | 0x17   | 1    | Flags              |
//! | 0x18   | 24   | Flash IDs (A, B)   |
//! | 0x30   | 20   | Extended settings  |

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ExiError, Result};
use crate::slot::Slot;

/// Size of the SRAM image in bytes.
pub const SRAM_SIZE: usize = 0x44;

/// Length of a memory card flash ID.
pub const FLASH_ID_LEN: usize = 12;

const CHECKSUM: usize = 0x04;
const CHECKSUM_INV: usize = 0x06;
const CHECKSUMMED: std::ops::Range<usize> = 0x08..0x18;
const RTC_BIAS: usize = 0x10;
const LANGUAGE: usize = 0x16;
const FLAGS: usize = 0x17;
const FLASH_IDS: usize = 0x18;

/// Settings flags of a console that has never been configured.
const DEFAULT_FLAGS: u8 = 0x2C;

/// SRAM contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sram {
    bytes: [u8; SRAM_SIZE],
}

impl Sram {
    /// Wrap a raw SRAM image.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SRAM_SIZE]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SRAM_SIZE] {
        &self.bytes
    }

    /// Load the image at `path`, falling back to defaults when the file is
    /// missing, unreadable or the wrong size.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read(path) {
            Ok(data) => match <[u8; SRAM_SIZE]>::try_from(data.as_slice()) {
                Ok(bytes) => Self::from_bytes(bytes),
                Err(_) => {
                    log::warn!(
                        "{} is {} bytes, expected {SRAM_SIZE}; using default SRAM",
                        path.display(),
                        data.len()
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("{} not found; using default SRAM", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to read {}: {e}; using default SRAM", path.display());
                Self::default()
            }
        }
    }

    /// Write the image to `path` verbatim.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.bytes).map_err(|source| ExiError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// RTC bias in seconds.
    #[must_use]
    pub fn rtc_bias(&self) -> u32 {
        u32::from_be_bytes([
            self.bytes[RTC_BIAS],
            self.bytes[RTC_BIAS + 1],
            self.bytes[RTC_BIAS + 2],
            self.bytes[RTC_BIAS + 3],
        ])
    }

    pub fn set_rtc_bias(&mut self, bias: u32) {
        self.bytes[RTC_BIAS..RTC_BIAS + 4].copy_from_slice(&bias.to_be_bytes());
        self.fix_checksums();
    }

    /// System language index.
    #[must_use]
    pub fn language(&self) -> u8 {
        self.bytes[LANGUAGE]
    }

    pub fn set_language(&mut self, language: u8) {
        self.bytes[LANGUAGE] = language;
        self.fix_checksums();
    }

    /// Flash ID of the card last formatted in a card slot. The serial port
    /// has no flash ID and reads as zeros.
    #[must_use]
    pub fn flash_id(&self, slot: Slot) -> [u8; FLASH_ID_LEN] {
        let mut id = [0u8; FLASH_ID_LEN];
        if let Some(offset) = flash_id_offset(slot) {
            id.copy_from_slice(&self.bytes[offset..offset + FLASH_ID_LEN]);
        }
        id
    }

    pub fn set_flash_id(&mut self, slot: Slot, id: [u8; FLASH_ID_LEN]) {
        if let Some(offset) = flash_id_offset(slot) {
            self.bytes[offset..offset + FLASH_ID_LEN].copy_from_slice(&id);
        }
    }

    /// Whether the settings checksums match their contents.
    #[must_use]
    pub fn checksums_valid(&self) -> bool {
        let (sum, inv) = self.compute_checksums();
        self.read_u16(CHECKSUM) == sum && self.read_u16(CHECKSUM_INV) == inv
    }

    /// Recompute both settings checksums.
    pub fn fix_checksums(&mut self) {
        let (sum, inv) = self.compute_checksums();
        self.bytes[CHECKSUM..CHECKSUM + 2].copy_from_slice(&sum.to_be_bytes());
        self.bytes[CHECKSUM_INV..CHECKSUM_INV + 2].copy_from_slice(&inv.to_be_bytes());
    }

    fn compute_checksums(&self) -> (u16, u16) {
        let mut sum = 0u16;
        let mut inv = 0u16;
        for word in self.bytes[CHECKSUMMED].chunks_exact(2) {
            let word = u16::from_be_bytes([word[0], word[1]]);
            sum = sum.wrapping_add(word);
            inv = inv.wrapping_add(!word);
        }
        (sum, inv)
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }
}

impl Default for Sram {
    fn default() -> Self {
        let mut bytes = [0u8; SRAM_SIZE];
        bytes[FLAGS] = DEFAULT_FLAGS;
        let mut sram = Self { bytes };
        sram.fix_checksums();
        sram
    }
}

fn flash_id_offset(slot: Slot) -> Option<usize> {
    match slot {
        Slot::A => Some(FLASH_IDS),
        Slot::B => Some(FLASH_IDS + FLASH_ID_LEN),
        Slot::Sp1 => None,
    }
}
