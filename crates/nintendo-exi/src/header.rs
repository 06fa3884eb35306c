//! Formatting metadata for memory cards created on a channel.

use crate::config::Region;
use crate::sram::{FLASH_ID_LEN, Sram};
use crate::slot::Slot;

/// 59-block card capacity in megabits. Larger cards double from here.
pub const MBIT_SIZE_MEMORY_CARD_59: u16 = 4;
/// 2043-block card capacity in megabits, used when no override is set.
pub const MBIT_SIZE_MEMORY_CARD_2043: u16 = 128;

/// Seconds between 1970-01-01 and the console epoch, 2000-01-01.
pub const GC_EPOCH: u64 = 946_684_800;

/// Card capacity for a size override: 0-4 select 59, 123, 251, 507 or 1019
/// blocks; any other value keeps the 2043-block default.
#[must_use]
pub fn card_size_mbits(size_override: i32) -> u16 {
    match u32::try_from(size_override) {
        Ok(shift @ 0..=4) => MBIT_SIZE_MEMORY_CARD_59 << shift,
        _ => MBIT_SIZE_MEMORY_CARD_2043,
    }
}

/// Everything a card device needs to format itself.
///
/// Computed once per channel at startup. Each channel gets a distinct
/// `format_time` so two cards created in the same second still end up with
/// different serial numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderData {
    pub flash_id: [u8; FLASH_ID_LEN],
    pub size_mbits: u16,
    pub shift_jis: bool,
    pub rtc_bias: u32,
    pub language: u32,
    /// Seconds since the console epoch.
    pub format_time: u64,
}

impl HeaderData {
    /// Header for `channel`, from SRAM, configuration and the host clock
    /// (seconds since 1970).
    #[must_use]
    pub fn new(
        sram: &Sram,
        size_override: i32,
        region: Region,
        host_time_secs: u64,
        channel: u32,
    ) -> Self {
        Self {
            flash_id: sram.flash_id(Slot::A),
            size_mbits: card_size_mbits(size_override),
            shift_jis: region.is_shift_jis(),
            rtc_bias: sram.rtc_bias(),
            language: u32::from(sram.language()),
            format_time: host_time_secs.saturating_sub(GC_EPOCH) + u64::from(channel),
        }
    }
}

impl Default for HeaderData {
    fn default() -> Self {
        Self {
            flash_id: [0; FLASH_ID_LEN],
            size_mbits: MBIT_SIZE_MEMORY_CARD_2043,
            shift_jis: false,
            rtc_bias: 0,
            language: 0,
            format_time: 0,
        }
    }
}
