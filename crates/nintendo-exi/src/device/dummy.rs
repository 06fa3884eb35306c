//! Stand-in for peripherals without a model.

use super::DeviceType;

/// Accepts every transfer, answers with zeros and logs what it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dummy {
    device_type: DeviceType,
}

impl Dummy {
    #[must_use]
    pub fn new(device_type: DeviceType) -> Self {
        Self { device_type }
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn set_cs(&mut self, selected: bool) {
        log::debug!("EXI DUMMY ({}) chip select {selected}", self.device_type);
    }

    pub fn transfer_byte(&mut self, byte: &mut u8) {
        log::debug!("EXI DUMMY ({}) byte {byte:#04x}", self.device_type);
    }
}
