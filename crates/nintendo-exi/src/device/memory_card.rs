//! Memory card as seen from the bus.

use emu_core::StateCursor;

use crate::header::HeaderData;

const CMD_NINTENDO_ID: u8 = 0x00;
const CMD_READ_STATUS: u8 = 0x83;

const STATUS_READY: u8 = 0x01;
const STATUS_UNLOCKED: u8 = 0x40;

/// A memory card in slot A or B.
///
/// Carries the formatting metadata for the card image and answers the ID
/// and status commands the IPL uses to detect a card. The rest of the
/// card protocol belongs to the card image backends.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCard {
    channel: u32,
    folder: bool,
    header: HeaderData,
    command: u8,
    position: u32,
    status: u8,
    interrupt: bool,
}

impl MemoryCard {
    #[must_use]
    pub fn new(channel: u32, folder: bool, header: HeaderData) -> Self {
        Self {
            channel,
            folder,
            header,
            command: 0,
            position: 0,
            status: STATUS_READY | STATUS_UNLOCKED,
            interrupt: false,
        }
    }

    /// Backed by a folder of save files rather than a raw image.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.folder
    }

    #[must_use]
    pub fn header(&self) -> &HeaderData {
        &self.header
    }

    /// ID word returned by the ID command: the capacity in megabits.
    #[must_use]
    pub fn card_id(&self) -> u32 {
        u32::from(self.header.size_mbits)
    }

    #[must_use]
    pub fn is_interrupt_set(&self) -> bool {
        self.interrupt
    }

    pub fn set_interrupt(&mut self, asserted: bool) {
        self.interrupt = asserted;
    }

    pub fn set_cs(&mut self, selected: bool) {
        if selected {
            self.position = 0;
        }
    }

    pub fn transfer_byte(&mut self, byte: &mut u8) {
        if self.position == 0 {
            self.command = *byte;
            if !matches!(self.command, CMD_NINTENDO_ID | CMD_READ_STATUS) {
                log::debug!(
                    "Memory card on channel {} ignores command {:#04x}",
                    self.channel,
                    self.command
                );
            }
        } else {
            match self.command {
                // One dummy byte follows the command, then the ID word.
                CMD_NINTENDO_ID => {
                    if let Some(index) = self.position.checked_sub(2).filter(|i| *i < 4) {
                        *byte = self.card_id().to_be_bytes()[index as usize];
                    }
                }
                CMD_READ_STATUS => *byte = self.status,
                _ => {}
            }
        }
        self.position = self.position.saturating_add(1);
    }

    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        cursor.do_marker("Memcard");
        cursor.do_u8(&mut self.command);
        cursor.do_u32(&mut self.position);
        cursor.do_u8(&mut self.status);
        cursor.do_bool(&mut self.interrupt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    fn card(size_mbits: u16) -> Device {
        let header = HeaderData {
            size_mbits,
            ..HeaderData::default()
        };
        Device::MemoryCard(MemoryCard::new(0, false, header))
    }

    #[test]
    fn id_command_reports_capacity() {
        let mut device = card(16);
        device.set_cs(1);
        device.imm_write(0x0000_0000, 2);
        assert_eq!(device.imm_read(4), 16);
    }

    #[test]
    fn status_command() {
        let mut device = card(4);
        device.set_cs(1);
        device.imm_write(0x8300_0000, 1);
        assert_eq!(device.imm_read(1) >> 24, 0x41);
    }

    #[test]
    fn unknown_command_returns_nothing() {
        let mut device = card(16);
        device.set_cs(1);
        device.imm_write(0x5200_0000, 1);
        assert_eq!(device.imm_read(4), 0);
    }

    #[test]
    fn chip_select_restarts_command() {
        let mut device = card(64);
        device.set_cs(1);
        device.imm_write(0x8300_0000, 1);
        device.set_cs(0);
        device.set_cs(1);
        device.imm_write(0x0000_0000, 2);
        assert_eq!(device.imm_read(4), 64);
    }
}
