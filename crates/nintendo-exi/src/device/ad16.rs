//! AD16 debug register.

use emu_core::StateCursor;

const CMD_INIT: u8 = 0x00;
const CMD_WRITE: u8 = 0xA0;
const CMD_READ: u8 = 0xA2;

/// ID the init command loads into the register.
const AD16_ID: u32 = 0x0412_0000;

/// A single 32-bit register on channel 2 that games and the IPL write
/// progress codes to. Bytes move least significant first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ad16 {
    register: u32,
    command: u8,
    position: u32,
}

impl Ad16 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(&self) -> u32 {
        self.register
    }

    pub fn set_cs(&mut self, selected: bool) {
        if selected {
            self.position = 0;
        }
    }

    pub fn transfer_byte(&mut self, byte: &mut u8) {
        if self.position == 0 {
            self.command = *byte;
        } else {
            match self.command {
                CMD_INIT => {
                    self.register = AD16_ID;
                    if let Some(index) = self.position.checked_sub(2).filter(|i| *i < 4) {
                        *byte = self.register.to_be_bytes()[index as usize];
                    }
                }
                CMD_WRITE => {
                    if let Some(index) = self.position.checked_sub(1).filter(|i| *i < 4) {
                        let shift = index * 8;
                        self.register =
                            (self.register & !(0xFF << shift)) | (u32::from(*byte) << shift);
                    }
                }
                CMD_READ => {
                    if let Some(index) = self.position.checked_sub(1).filter(|i| *i < 4) {
                        *byte = (self.register >> (index * 8)) as u8;
                    }
                }
                other => log::debug!("AD16: unknown command {other:#04x}"),
            }
        }
        self.position = self.position.saturating_add(1);
    }

    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        cursor.do_marker("AD16");
        cursor.do_u32(&mut self.register);
        cursor.do_u8(&mut self.command);
        cursor.do_u32(&mut self.position);
    }
}
