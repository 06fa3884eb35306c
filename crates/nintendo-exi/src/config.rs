//! EXI configuration: per-slot devices, card size and console region.

use std::path::PathBuf;

use crate::device::DeviceType;
use crate::slot::Slot;

/// Console region. Only the card text encoding depends on it here.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "native", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// Japan. Cards are formatted with Shift-JIS text.
    NtscJ,
    /// North America.
    #[default]
    NtscU,
    /// Europe and Australia.
    Pal,
    /// Korea.
    NtscK,
}

impl Region {
    /// Whether memory cards use Shift-JIS (otherwise Windows-1252).
    #[must_use]
    pub const fn is_shift_jis(self) -> bool {
        matches!(self, Region::NtscJ)
    }
}

/// Configuration read by the expansion interface at startup.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "native", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "native", serde(default))]
pub struct ExiConfig {
    /// Device inserted in memory card slot A.
    pub slot_a: DeviceType,
    /// Device inserted in memory card slot B.
    pub slot_b: DeviceType,
    /// Device attached to serial port 1.
    pub serial_port_1: DeviceType,
    /// Card size override. 0-4 picks 59 to 1019 blocks; anything else
    /// keeps the 2043-block default.
    pub memory_card_size: i32,
    /// Console region.
    pub region: Region,
    /// Where SRAM is loaded from and saved to.
    pub sram_path: PathBuf,
}

impl ExiConfig {
    /// Configured device type for `slot`.
    #[must_use]
    pub fn device_for(&self, slot: Slot) -> DeviceType {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
            Slot::Sp1 => self.serial_port_1,
        }
    }

    /// Parse a configuration from JSON. Missing fields take defaults.
    #[cfg(feature = "native")]
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for ExiConfig {
    fn default() -> Self {
        Self {
            slot_a: DeviceType::MemoryCardFolder,
            slot_b: DeviceType::None,
            serial_port_1: DeviceType::None,
            memory_card_size: -1,
            region: Region::default(),
            sram_path: PathBuf::from("SRAM.raw"),
        }
    }
}
