//! Boot ROM on channel 0, device 1.

use emu_core::StateCursor;

/// The IPL mask ROM.
///
/// Software addresses it with a 32-bit command word before reading. The
/// ROM contents, RTC and UART live in the boot ROM backend; on the bus this
/// model only latches the command word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaskRom {
    address: u32,
    position: u32,
}

impl MaskRom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last latched command word.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn set_cs(&mut self, selected: bool) {
        if selected {
            self.position = 0;
        }
    }

    pub fn transfer_byte(&mut self, byte: &mut u8) {
        if self.position < 4 {
            let shift = 24 - self.position * 8;
            self.address = (self.address & !(0xFF << shift)) | (u32::from(*byte) << shift);
        }
        self.position = self.position.saturating_add(1);
    }

    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        cursor.do_marker("IPL");
        cursor.do_u32(&mut self.address);
        cursor.do_u32(&mut self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    #[test]
    fn latches_command_word() {
        let mut device = Device::MaskRom(MaskRom::new());
        device.set_cs(1);
        device.imm_write(0x2000_0100, 4);
        let Device::MaskRom(rom) = &device else {
            unreachable!()
        };
        assert_eq!(rom.address(), 0x2000_0100);
    }
}
