//! What an active replay expects of the expansion interface.

use crate::slot::Slot;

/// Replay state read during provisioning.
///
/// The replay subsystem owns the recording; the expansion interface only
/// needs to know whether playback is running, whether the recording carries
/// its own hardware configuration, and which card slots were populated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MovieState {
    /// Input playback is in progress.
    pub playing_input: bool,
    /// The recording stored its hardware configuration.
    pub config_saved: bool,
    /// Per card slot (A, B): the recording had a memory card inserted.
    pub memcards: [bool; 2],
}

impl MovieState {
    #[must_use]
    pub fn is_playing_input(&self) -> bool {
        self.playing_input
    }

    #[must_use]
    pub fn is_config_saved(&self) -> bool {
        self.config_saved
    }

    /// Whether the recording expects a memory card in `slot`. Serial port
    /// devices are never recorded.
    #[must_use]
    pub fn is_using_memcard(&self, slot: Slot) -> bool {
        match slot {
            Slot::A => self.memcards[0],
            Slot::B => self.memcards[1],
            Slot::Sp1 => false,
        }
    }

    /// Playback that must reproduce the recorded hardware configuration.
    #[must_use]
    pub fn enforces_config(&self) -> bool {
        self.is_playing_input() && self.is_config_saved()
    }
}
