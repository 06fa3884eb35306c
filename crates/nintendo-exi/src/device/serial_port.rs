//! Serial port 1 adapters.

use emu_core::StateCursor;

use super::DeviceType;

/// A network or modem adapter on serial port 1.
///
/// The adapters run host-side I/O in the background and raise their
/// interrupt line when packets arrive. That background activity has to stop
/// while the emulation strand is locked for savestates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPort {
    device_type: DeviceType,
    command: u8,
    position: u32,
    interrupt: bool,
    paused: bool,
}

impl SerialPort {
    #[must_use]
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            command: 0,
            position: 0,
            interrupt: false,
            paused: false,
        }
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    #[must_use]
    pub fn is_interrupt_set(&self) -> bool {
        self.interrupt
    }

    pub fn set_interrupt(&mut self, asserted: bool) {
        self.interrupt = asserted;
    }

    /// Background activity is suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_cs(&mut self, selected: bool) {
        if selected {
            self.position = 0;
        }
    }

    pub fn transfer_byte(&mut self, byte: &mut u8) {
        if self.position == 0 {
            self.command = *byte;
        }
        self.position = self.position.saturating_add(1);
    }

    pub fn pause_and_lock(&mut self, lock: bool, unpause_on_unlock: bool) {
        if lock {
            self.paused = true;
        } else if unpause_on_unlock {
            self.paused = false;
        }
    }

    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        cursor.do_marker("SP1");
        cursor.do_u8(&mut self.command);
        cursor.do_u32(&mut self.position);
        cursor.do_bool(&mut self.interrupt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_follows_lock() {
        let mut sp = SerialPort::new(DeviceType::Ethernet);
        sp.pause_and_lock(true, false);
        assert!(sp.is_paused());
        sp.pause_and_lock(false, false);
        assert!(sp.is_paused());
        sp.pause_and_lock(true, true);
        sp.pause_and_lock(false, true);
        assert!(!sp.is_paused());
    }
}
