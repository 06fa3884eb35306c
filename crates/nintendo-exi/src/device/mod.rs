//! Peripheral devices that sit on an EXI channel.
//!
//! The set of devices is closed: every behaviour that depends on the kind of
//! device is an exhaustive `match` over [`Device`]. Only the parts of each
//! peripheral that the bus itself observes are modelled here: presence,
//! the interrupt line, chip select, immediate transfers and savestate.

mod ad16;
mod dummy;
mod mask_rom;
mod memory_card;
mod serial_port;

use std::fmt;

use emu_core::StateCursor;

use crate::header::HeaderData;

pub use ad16::Ad16;
pub use dummy::Dummy;
pub use mask_rom::MaskRom;
pub use memory_card::MemoryCard;
pub use serial_port::SerialPort;

/// Device type tag.
///
/// The numeric values are stable: they are stored in savestates, replay
/// records and configuration files, and travel through the scheduler as
/// a 16-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "native", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum DeviceType {
    Dummy = 0,
    MemoryCard = 1,
    MaskRom = 2,
    Ad16 = 3,
    Microphone = 4,
    Ethernet = 5,
    AmBaseboard = 6,
    Gecko = 7,
    /// A memory card backed by a folder of save files rather than a raw
    /// image. Same hardware as [`DeviceType::MemoryCard`].
    MemoryCardFolder = 8,
    Agp = 9,
    EthernetXLink = 10,
    EthernetTapServer = 11,
    EthernetBuiltIn = 12,
    ModemTapServer = 13,
    None = 0xFF,
}

impl DeviceType {
    /// Decode a stored tag. Unknown values become [`DeviceType::Dummy`].
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::MemoryCard,
            2 => Self::MaskRom,
            3 => Self::Ad16,
            4 => Self::Microphone,
            5 => Self::Ethernet,
            6 => Self::AmBaseboard,
            7 => Self::Gecko,
            8 => Self::MemoryCardFolder,
            9 => Self::Agp,
            10 => Self::EthernetXLink,
            11 => Self::EthernetTapServer,
            12 => Self::EthernetBuiltIn,
            13 => Self::ModemTapServer,
            0xFF => Self::None,
            _ => Self::Dummy,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Either kind of memory card.
    #[must_use]
    pub const fn is_memory_card(self) -> bool {
        matches!(self, Self::MemoryCard | Self::MemoryCardFolder)
    }

    /// Adapters that plug into the serial port.
    #[must_use]
    pub const fn is_serial_port(self) -> bool {
        matches!(
            self,
            Self::Ethernet
                | Self::EthernetXLink
                | Self::EthernetTapServer
                | Self::EthernetBuiltIn
                | Self::ModemTapServer
        )
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dummy => "Dummy",
            Self::MemoryCard => "Memory Card",
            Self::MaskRom => "Mask ROM",
            Self::Ad16 => "AD16",
            Self::Microphone => "Microphone",
            Self::Ethernet => "Broadband Adapter (TAP)",
            Self::AmBaseboard => "Triforce AM Baseboard",
            Self::Gecko => "USB Gecko",
            Self::MemoryCardFolder => "GCI Folder",
            Self::Agp => "Advance Game Port",
            Self::EthernetXLink => "Broadband Adapter (XLink Kai)",
            Self::EthernetTapServer => "Broadband Adapter (tapserver)",
            Self::EthernetBuiltIn => "Broadband Adapter (HLE)",
            Self::ModemTapServer => "Modem Adapter (tapserver)",
            Self::None => "<Nothing>",
        };
        f.write_str(name)
    }
}

/// A device instance, exclusively owned by one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    /// Empty device position.
    None,
    /// Placeholder for peripherals without a model.
    Dummy(Dummy),
    MemoryCard(MemoryCard),
    /// Boot ROM and real-time clock.
    MaskRom(MaskRom),
    /// Debug register used by development hardware.
    Ad16(Ad16),
    /// Network and modem adapters on serial port 1.
    SerialPort(SerialPort),
}

impl Device {
    /// Build a device of `device_type` for `channel`.
    ///
    /// The requested tag is preserved, so a folder-backed card reports
    /// [`DeviceType::MemoryCardFolder`] and an unmodelled peripheral keeps
    /// its own type even though it behaves as a dummy.
    #[must_use]
    pub fn create(device_type: DeviceType, channel: u32, header: &HeaderData) -> Self {
        match device_type {
            DeviceType::None => Device::None,
            DeviceType::MemoryCard | DeviceType::MemoryCardFolder => {
                Device::MemoryCard(MemoryCard::new(
                    channel,
                    device_type == DeviceType::MemoryCardFolder,
                    *header,
                ))
            }
            DeviceType::MaskRom => Device::MaskRom(MaskRom::new()),
            DeviceType::Ad16 => Device::Ad16(Ad16::new()),
            DeviceType::Ethernet
            | DeviceType::EthernetXLink
            | DeviceType::EthernetTapServer
            | DeviceType::EthernetBuiltIn
            | DeviceType::ModemTapServer => Device::SerialPort(SerialPort::new(device_type)),
            DeviceType::Dummy
            | DeviceType::Microphone
            | DeviceType::AmBaseboard
            | DeviceType::Gecko
            | DeviceType::Agp => Device::Dummy(Dummy::new(device_type)),
        }
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        match self {
            Device::None => DeviceType::None,
            Device::Dummy(d) => d.device_type(),
            Device::MemoryCard(card) => {
                if card.is_folder() {
                    DeviceType::MemoryCardFolder
                } else {
                    DeviceType::MemoryCard
                }
            }
            Device::MaskRom(_) => DeviceType::MaskRom,
            Device::Ad16(_) => DeviceType::Ad16,
            Device::SerialPort(sp) => sp.device_type(),
        }
    }

    /// Whether the device answers on the bus (drives the EXT status bit).
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Device::None | Device::Dummy(_) | Device::MaskRom(_) => false,
            Device::MemoryCard(_) | Device::Ad16(_) | Device::SerialPort(_) => true,
        }
    }

    /// Whether the device is asserting its interrupt line.
    #[must_use]
    pub fn is_interrupt_set(&self) -> bool {
        match self {
            Device::None | Device::Dummy(_) | Device::MaskRom(_) | Device::Ad16(_) => false,
            Device::MemoryCard(card) => card.is_interrupt_set(),
            Device::SerialPort(sp) => sp.is_interrupt_set(),
        }
    }

    /// Drive the device's interrupt line. Devices without one ignore this
    /// and return `false`.
    pub fn set_interrupt(&mut self, asserted: bool) -> bool {
        match self {
            Device::None | Device::Dummy(_) | Device::MaskRom(_) | Device::Ad16(_) => false,
            Device::MemoryCard(card) => {
                card.set_interrupt(asserted);
                true
            }
            Device::SerialPort(sp) => {
                sp.set_interrupt(asserted);
                true
            }
        }
    }

    /// Chip select changed. `cs` is non-zero while the device is selected.
    pub fn set_cs(&mut self, cs: u32) {
        let selected = cs != 0;
        match self {
            Device::None => {}
            Device::Dummy(d) => d.set_cs(selected),
            Device::MemoryCard(card) => card.set_cs(selected),
            Device::MaskRom(rom) => rom.set_cs(selected),
            Device::Ad16(ad) => ad.set_cs(selected),
            Device::SerialPort(sp) => sp.set_cs(selected),
        }
    }

    fn transfer_byte(&mut self, byte: &mut u8) {
        match self {
            Device::None => {}
            Device::Dummy(d) => d.transfer_byte(byte),
            Device::MemoryCard(card) => card.transfer_byte(byte),
            Device::MaskRom(rom) => rom.transfer_byte(byte),
            Device::Ad16(ad) => ad.transfer_byte(byte),
            Device::SerialPort(sp) => sp.transfer_byte(byte),
        }
    }

    /// Shift `size` bytes of `data` out to the device, most significant
    /// byte first.
    pub fn imm_write(&mut self, mut data: u32, size: u32) {
        for _ in 0..size.min(4) {
            let mut byte = (data >> 24) as u8;
            self.transfer_byte(&mut byte);
            data <<= 8;
        }
    }

    /// Shift `size` bytes in from the device, packed from the most
    /// significant byte down.
    pub fn imm_read(&mut self, size: u32) -> u32 {
        let mut result = 0u32;
        for position in 0..size.min(4) {
            let mut byte = 0u8;
            self.transfer_byte(&mut byte);
            result |= u32::from(byte) << (24 - position * 8);
        }
        result
    }

    /// Full-duplex transfer: each byte of `data` goes out and is replaced
    /// by the byte the device shifts back.
    pub fn imm_read_write(&mut self, data: &mut u32, size: u32) {
        let mut result = 0u32;
        for position in 0..size.min(4) {
            let shift = 24 - position * 8;
            let mut byte = (*data >> shift) as u8;
            self.transfer_byte(&mut byte);
            result |= u32::from(byte) << shift;
        }
        *data = result;
    }

    /// DMA from the device into guest memory.
    ///
    /// Guest memory is not part of this crate, so the transfer only
    /// completes on the bus side.
    pub fn dma_read(&mut self, address: u32, length: u32) {
        log::debug!(
            "EXI DMA read {length:#x} bytes to {address:#010x} from {}",
            self.device_type()
        );
    }

    /// DMA from guest memory to the device. See [`Device::dma_read`].
    pub fn dma_write(&mut self, address: u32, length: u32) {
        log::debug!(
            "EXI DMA write {length:#x} bytes from {address:#010x} to {}",
            self.device_type()
        );
    }

    /// Save or load the device's own state. The type tag is handled by
    /// the channel.
    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        match self {
            Device::None | Device::Dummy(_) => {}
            Device::MemoryCard(card) => card.do_state(cursor),
            Device::MaskRom(rom) => rom.do_state(cursor),
            Device::Ad16(ad) => ad.do_state(cursor),
            Device::SerialPort(sp) => sp.do_state(cursor),
        }
    }

    /// Suspend or resume any background activity.
    pub fn pause_and_lock(&mut self, lock: bool, unpause_on_unlock: bool) {
        match self {
            Device::None
            | Device::Dummy(_)
            | Device::MemoryCard(_)
            | Device::MaskRom(_)
            | Device::Ad16(_) => {}
            Device::SerialPort(sp) => sp.pause_and_lock(lock, unpause_on_unlock),
        }
    }
}
