//! User-facing slots and their bus addresses.
//!
//! | Slot   | Channel | Device |
//! |--------|---------|--------|
//! | A      | 0       | 0      |
//! | B      | 1       | 0      |
//! | SP1    | 0       | 2      |

use std::fmt;

use crate::error::ExiError;

/// A user-facing bay on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "native", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
    /// Memory card slot A.
    A,
    /// Memory card slot B.
    B,
    /// Serial port 1 (broadband adapter, modem).
    Sp1,
}

/// Slots that take memory cards, in provisioning order.
pub const MEMCARD_SLOTS: [Slot; 2] = [Slot::A, Slot::B];

impl Slot {
    /// Index used in configuration and replay records.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
            Slot::Sp1 => 2,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = ExiError;

    /// An out-of-range index is a caller bug. It is logged here; callers
    /// that must keep going fall back to [`Slot::A`].
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Slot::A),
            1 => Ok(Slot::B),
            2 => Ok(Slot::Sp1),
            _ => {
                log::error!("Unhandled slot {raw}");
                Err(ExiError::InvalidSlot(raw))
            }
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::A => write!(f, "Slot A"),
            Slot::B => write!(f, "Slot B"),
            Slot::Sp1 => write!(f, "Serial Port 1"),
        }
    }
}

/// Channel that carries `slot`.
#[must_use]
pub const fn slot_to_exi_channel(slot: Slot) -> u8 {
    match slot {
        Slot::A | Slot::Sp1 => 0,
        Slot::B => 1,
    }
}

/// Device number of `slot` within its channel.
#[must_use]
pub const fn slot_to_exi_device(slot: Slot) -> u8 {
    match slot {
        Slot::A | Slot::B => 0,
        Slot::Sp1 => 2,
    }
}
