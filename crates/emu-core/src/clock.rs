//! Master clock configuration.

use crate::Ticks;

/// Master clock configuration for a system.
///
/// Each system has a master crystal that drives all timing. Delays that
/// model real-world durations are expressed in ticks of this clock, never
/// in wall-clock time, so replays stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `486_000_000` for the GameCube CPU).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// One second of virtual time.
    #[must_use]
    pub const fn ticks_per_second(&self) -> Ticks {
        Ticks::new(self.frequency_hz)
    }
}
