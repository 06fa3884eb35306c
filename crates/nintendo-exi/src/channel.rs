//! One EXI channel: five registers and up to three devices.
//!
//! # Register map (offsets from the channel base)
//!
//! | Offset | Register    |
//! |--------|-------------|
//! | 0x00   | Status      |
//! | 0x04   | DMA address |
//! | 0x08   | DMA length  |
//! | 0x0C   | Control     |
//! | 0x10   | Immediate   |
//!
//! # Status bits
//!
//! | Bit   | Name        |
//! |-------|-------------|
//! | 0     | EXIINTMASK  |
//! | 1     | EXIINT      |
//! | 2     | TCINTMASK   |
//! | 3     | TCINT       |
//! | 4-6   | CLK         |
//! | 7-9   | CHIP_SELECT |
//! | 10    | EXTINTMASK  |
//! | 11    | EXTINT      |
//! | 12    | EXT         |
//! | 13    | ROMDIS      |

use emu_core::{MmioMapping, Observable, StateCursor, Value};

use crate::device::{Device, DeviceType};
use crate::header::HeaderData;

/// Device positions per channel.
pub const NUM_DEVICES: usize = 3;

/// Bytes of register space each channel occupies.
pub const CHANNEL_REGISTER_BYTES: u32 = 5 * 4;

const EXIINTMASK: u32 = 1 << 0;
const EXIINT: u32 = 1 << 1;
const TCINTMASK: u32 = 1 << 2;
const TCINT: u32 = 1 << 3;
const CLK: u32 = 0b111 << 4;
const CHIP_SELECT_SHIFT: u32 = 7;
const CHIP_SELECT: u32 = 0b111 << CHIP_SELECT_SHIFT;
const EXTINTMASK: u32 = 1 << 10;
const EXTINT: u32 = 1 << 11;
const EXT: u32 = 1 << 12;
const ROMDIS: u32 = 1 << 13;

const TSTART: u32 = 1 << 0;
const DMA: u32 = 1 << 1;

const EXI_READ: u32 = 0;
const EXI_WRITE: u32 = 1;
const EXI_READWRITE: u32 = 2;

/// DMA address and length are 32-byte aligned.
const DMA_ALIGN_MASK: u32 = !0x1F;

/// One of a channel's five registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExiRegister {
    Status,
    DmaAddress,
    DmaLength,
    DmaControl,
    ImmData,
}

impl ExiRegister {
    pub const ALL: [ExiRegister; 5] = [
        ExiRegister::Status,
        ExiRegister::DmaAddress,
        ExiRegister::DmaLength,
        ExiRegister::DmaControl,
        ExiRegister::ImmData,
    ];

    /// Byte offset from the channel base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            ExiRegister::Status => 0x00,
            ExiRegister::DmaAddress => 0x04,
            ExiRegister::DmaLength => 0x08,
            ExiRegister::DmaControl => 0x0C,
            ExiRegister::ImmData => 0x10,
        }
    }
}

/// MMIO handler tag: which channel register an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExiMmio {
    pub channel: u8,
    pub register: ExiRegister,
}

/// Device position selected by a one-hot chip-select mask.
const fn device_index(chip_select: u32) -> Option<usize> {
    match chip_select {
        1 => Some(0),
        2 => Some(1),
        4 => Some(2),
        _ => None,
    }
}

/// An EXI channel.
#[derive(Debug, Clone)]
pub struct Channel {
    channel_id: u32,
    status: u32,
    dma_memory_address: u32,
    dma_length: u32,
    control: u32,
    imm_data: u32,
    devices: [Device; NUM_DEVICES],
    header: HeaderData,
}

impl Channel {
    /// Empty channel. `header` is used for every memory card created on it.
    #[must_use]
    pub fn new(channel_id: u32, header: HeaderData) -> Self {
        Self {
            channel_id,
            status: 0,
            dma_memory_address: 0,
            dma_length: 0,
            control: 0,
            imm_data: 0,
            devices: [Device::None, Device::None, Device::None],
            header,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    #[must_use]
    pub fn header(&self) -> &HeaderData {
        &self.header
    }

    /// Replace device `num` with a new device of `device_type`.
    ///
    /// Returns `true` when software must be told that presence changed,
    /// i.e. EXTINT was raised and interrupts need re-evaluating.
    pub fn add_device(&mut self, device_type: DeviceType, num: usize) -> bool {
        let device = Device::create(device_type, self.channel_id, &self.header);
        self.install_device(device, num, true)
    }

    fn install_device(
        &mut self,
        device: Device,
        num: usize,
        notify_presence_changed: bool,
    ) -> bool {
        log::info!(
            "Changing EXI channel {}, device {num} to type {} (notify software: {})",
            self.channel_id,
            device.device_type(),
            notify_presence_changed
        );
        self.devices[num] = device;

        // Channel 2 has no external interrupt.
        if notify_presence_changed && self.channel_id != 2 {
            self.status |= EXTINT;
            return true;
        }
        false
    }

    /// Device at position `num` (0-2).
    #[must_use]
    pub fn device(&self, num: usize) -> &Device {
        &self.devices[num]
    }

    pub fn device_mut(&mut self, num: usize) -> &mut Device {
        &mut self.devices[num]
    }

    /// Device selected by a one-hot chip-select mask (1, 2 or 4).
    #[must_use]
    pub fn get_device(&self, chip_select: u32) -> Option<&Device> {
        device_index(chip_select).map(|i| &self.devices[i])
    }

    pub fn get_device_mut(&mut self, chip_select: u32) -> Option<&mut Device> {
        device_index(chip_select).map(|i| &mut self.devices[i])
    }

    /// Register this channel's five registers at `base`.
    ///
    /// `base` is generally not aligned to the register block size, so
    /// register addresses are formed by addition, never by OR-ing offsets.
    pub fn register_mmio(&self, mapping: &mut MmioMapping<ExiMmio>, base: u32) {
        let channel = self.channel_id as u8;
        for register in ExiRegister::ALL {
            mapping.register(base + register.offset(), ExiMmio { channel, register });
        }
    }

    /// CPU read of a register.
    pub fn read_register(&mut self, register: ExiRegister) -> u32 {
        match register {
            ExiRegister::Status => {
                // Only the card slots report whether something is plugged in.
                let present = self.channel_id != 2 && self.devices[0].is_present();
                set_bits(&mut self.status, EXT, present);
                self.status
            }
            ExiRegister::DmaAddress => self.dma_memory_address,
            ExiRegister::DmaLength => self.dma_length,
            ExiRegister::DmaControl => self.control,
            ExiRegister::ImmData => self.imm_data,
        }
    }

    /// CPU write of a register. Returns `true` when the interrupt state
    /// must be re-evaluated.
    pub fn write_register(&mut self, register: ExiRegister, value: u32) -> bool {
        log::debug!("EXI channel {} {register:?} <- {value:#010x}", self.channel_id);
        match register {
            ExiRegister::Status => {
                self.write_status(value);
                true
            }
            ExiRegister::DmaAddress => {
                self.dma_memory_address = value & DMA_ALIGN_MASK;
                false
            }
            ExiRegister::DmaLength => {
                self.dma_length = value & DMA_ALIGN_MASK;
                false
            }
            ExiRegister::DmaControl => self.write_control(value),
            ExiRegister::ImmData => {
                self.imm_data = value;
                false
            }
        }
    }

    fn write_status(&mut self, value: u32) {
        set_bits(&mut self.status, EXIINTMASK, value & EXIINTMASK != 0);
        if value & EXIINT != 0 {
            self.status &= !EXIINT;
        }

        set_bits(&mut self.status, TCINTMASK, value & TCINTMASK != 0);
        if value & TCINT != 0 {
            self.status &= !TCINT;
        }

        self.status = (self.status & !CLK) | (value & CLK);

        if self.channel_id == 0 || self.channel_id == 1 {
            set_bits(&mut self.status, EXTINTMASK, value & EXTINTMASK != 0);
            if value & EXTINT != 0 {
                self.status &= !EXTINT;
            }
        }

        if self.channel_id == 0 {
            set_bits(&mut self.status, ROMDIS, value & ROMDIS != 0);
        }

        let old_cs = self.chip_select();
        let new_cs = (value & CHIP_SELECT) >> CHIP_SELECT_SHIFT;
        self.status = (self.status & !CHIP_SELECT) | (new_cs << CHIP_SELECT_SHIFT);
        if let Some(device) = self.get_device_mut(old_cs ^ new_cs) {
            device.set_cs(new_cs);
        }
    }

    fn write_control(&mut self, value: u32) -> bool {
        self.control = value;
        if self.control & TSTART == 0 {
            return false;
        }

        let Some(index) = device_index(self.chip_select()) else {
            return false;
        };
        let device = &mut self.devices[index];
        let rw = (self.control >> 2) & 0b11;
        let size = ((self.control >> 4) & 0b11) + 1;

        if self.control & DMA == 0 {
            match rw {
                EXI_READ => self.imm_data = device.imm_read(size),
                EXI_WRITE => device.imm_write(self.imm_data, size),
                EXI_READWRITE => device.imm_read_write(&mut self.imm_data, size),
                _ => log::error!("EXI Imm: Unknown transfer type {rw}"),
            }
        } else {
            match rw {
                EXI_READ => device.dma_read(self.dma_memory_address, self.dma_length),
                EXI_WRITE => device.dma_write(self.dma_memory_address, self.dma_length),
                _ => log::error!("EXI DMA: Unknown transfer type {rw}"),
            }
        }

        self.control &= !TSTART;
        self.status |= TCINT;
        true
    }

    fn chip_select(&self) -> u32 {
        (self.status & CHIP_SELECT) >> CHIP_SELECT_SHIFT
    }

    /// Drive the EXIINT status bit from outside the channel.
    pub fn set_exi_int(&mut self, asserted: bool) {
        set_bits(&mut self.status, EXIINT, asserted);
    }

    #[must_use]
    pub fn exi_int(&self) -> bool {
        self.status & EXIINT != 0
    }

    /// Whether any unmasked interrupt source on this channel is pending.
    ///
    /// On the card channels an interrupt from device 0 latches EXIINT.
    pub fn is_causing_interrupt(&mut self) -> bool {
        if self.channel_id != 2 && self.devices[0].is_interrupt_set() {
            self.status |= EXIINT;
        }

        let pending = |flag: u32, mask: u32| self.status & flag != 0 && self.status & mask != 0;
        pending(EXIINT, EXIINTMASK) || pending(TCINT, TCINTMASK) || pending(EXTINT, EXTINTMASK)
    }

    /// Save or load registers and devices.
    ///
    /// On load a device whose stored type differs from the current one is
    /// recreated without telling software its presence changed: the loaded
    /// registers already describe the saved machine.
    pub fn do_state(&mut self, cursor: &mut StateCursor) {
        cursor.do_marker("EXIChan");
        cursor.do_u32(&mut self.status);
        cursor.do_u32(&mut self.dma_memory_address);
        cursor.do_u32(&mut self.dma_length);
        cursor.do_u32(&mut self.control);
        cursor.do_u32(&mut self.imm_data);

        for num in 0..NUM_DEVICES {
            let current = self.devices[num].device_type();
            let mut raw = current.as_u16();
            cursor.do_u16(&mut raw);
            if !cursor.is_ok() {
                return;
            }
            let stored = DeviceType::from_u16(raw);

            if stored == current {
                self.devices[num].do_state(cursor);
            } else {
                let mut device = Device::create(stored, self.channel_id, &self.header);
                device.do_state(cursor);
                if cursor.is_ok() {
                    self.install_device(device, num, false);
                }
            }
        }
    }

    /// Let every device suspend or resume background activity.
    pub fn pause_and_lock(&mut self, lock: bool, unpause_on_unlock: bool) {
        for device in &mut self.devices {
            device.pause_and_lock(lock, unpause_on_unlock);
        }
    }
}

fn set_bits(reg: &mut u32, bits: u32, on: bool) {
    if on {
        *reg |= bits;
    } else {
        *reg &= !bits;
    }
}

impl Observable for Channel {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "status" => Some(self.status.into()),
            "dma_address" => Some(self.dma_memory_address.into()),
            "dma_length" => Some(self.dma_length.into()),
            "control" => Some(self.control.into()),
            "imm_data" => Some(self.imm_data.into()),
            "devices" => Some(Value::Array(
                self.devices
                    .iter()
                    .map(|d| Value::String(d.device_type().to_string()))
                    .collect(),
            )),
            "device0" => Some(Value::String(self.devices[0].device_type().to_string())),
            "device1" => Some(Value::String(self.devices[1].device_type().to_string())),
            "device2" => Some(Value::String(self.devices[2].device_type().to_string())),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "status",
            "dma_address",
            "dma_length",
            "control",
            "imm_data",
            "devices",
            "device0",
            "device1",
            "device2",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: u32) -> Channel {
        Channel::new(id, HeaderData::default())
    }

    fn control(rw: u32, tlen: u32) -> u32 {
        TSTART | (rw << 2) | ((tlen - 1) << 4)
    }

    #[test]
    fn starts_empty() {
        let ch = channel(0);
        for num in 0..NUM_DEVICES {
            assert_eq!(ch.device(num).device_type(), DeviceType::None);
        }
        assert!(ch.get_device(3).is_none());
        assert!(ch.get_device(0).is_none());
    }

    #[test]
    fn chip_select_masks() {
        let mut ch = channel(0);
        ch.add_device(DeviceType::MemoryCard, 0);
        ch.add_device(DeviceType::MaskRom, 1);
        ch.add_device(DeviceType::Ethernet, 2);
        assert_eq!(ch.get_device(1).map(Device::device_type), Some(DeviceType::MemoryCard));
        assert_eq!(ch.get_device(2).map(Device::device_type), Some(DeviceType::MaskRom));
        assert_eq!(ch.get_device(4).map(Device::device_type), Some(DeviceType::Ethernet));
    }

    #[test]
    fn presence_change_raises_extint_on_card_channels() {
        let mut ch0 = channel(0);
        assert!(ch0.add_device(DeviceType::MemoryCard, 0));
        assert_ne!(ch0.read_register(ExiRegister::Status) & EXTINT, 0);

        let mut ch2 = channel(2);
        assert!(!ch2.add_device(DeviceType::Ad16, 0));
        assert_eq!(ch2.read_register(ExiRegister::Status) & EXTINT, 0);
    }

    #[test]
    fn ext_reports_card_presence() {
        let mut ch = channel(1);
        assert_eq!(ch.read_register(ExiRegister::Status) & EXT, 0);
        ch.add_device(DeviceType::MemoryCard, 0);
        assert_ne!(ch.read_register(ExiRegister::Status) & EXT, 0);

        let mut ch2 = channel(2);
        ch2.add_device(DeviceType::Ad16, 0);
        assert_eq!(ch2.read_register(ExiRegister::Status) & EXT, 0);
    }

    #[test]
    fn status_write_one_clears_interrupts() {
        let mut ch = channel(0);
        ch.add_device(DeviceType::MemoryCard, 0);
        ch.set_exi_int(true);
        ch.write_register(ExiRegister::Status, EXTINTMASK);
        let status = ch.read_register(ExiRegister::Status);
        assert_ne!(status & EXTINT, 0);
        assert_ne!(status & EXIINT, 0);

        ch.write_register(ExiRegister::Status, EXTINT | EXIINT);
        let status = ch.read_register(ExiRegister::Status);
        assert_eq!(status & (EXTINT | EXIINT), 0);
        assert_eq!(status & EXTINTMASK, 0);
    }

    #[test]
    fn extint_and_romdis_are_channel_specific() {
        let mut ch2 = channel(2);
        ch2.write_register(ExiRegister::Status, EXTINTMASK | ROMDIS);
        assert_eq!(ch2.read_register(ExiRegister::Status) & (EXTINTMASK | ROMDIS), 0);

        let mut ch1 = channel(1);
        ch1.write_register(ExiRegister::Status, EXTINTMASK | ROMDIS);
        assert_eq!(ch1.read_register(ExiRegister::Status) & (EXTINTMASK | ROMDIS), EXTINTMASK);

        let mut ch0 = channel(0);
        ch0.write_register(ExiRegister::Status, ROMDIS);
        assert_ne!(ch0.read_register(ExiRegister::Status) & ROMDIS, 0);
    }

    #[test]
    fn dma_registers_are_aligned() {
        let mut ch = channel(0);
        ch.write_register(ExiRegister::DmaAddress, 0x8000_123F);
        ch.write_register(ExiRegister::DmaLength, 0x47);
        assert_eq!(ch.read_register(ExiRegister::DmaAddress), 0x8000_1220);
        assert_eq!(ch.read_register(ExiRegister::DmaLength), 0x40);
    }

    #[test]
    fn immediate_transfer_through_registers() {
        let mut ch = channel(2);
        ch.add_device(DeviceType::Ad16, 0);
        ch.write_register(ExiRegister::Status, 1 << CHIP_SELECT_SHIFT);

        ch.write_register(ExiRegister::ImmData, 0x0000_0000);
        assert!(ch.write_register(ExiRegister::DmaControl, control(EXI_WRITE, 2)));
        assert!(ch.write_register(ExiRegister::DmaControl, control(EXI_READ, 4)));
        assert_eq!(ch.read_register(ExiRegister::ImmData), 0x0412_0000);

        assert_eq!(ch.read_register(ExiRegister::DmaControl) & TSTART, 0);
        assert_ne!(ch.read_register(ExiRegister::Status) & TCINT, 0);
    }

    #[test]
    fn transfer_without_selected_device_does_nothing() {
        let mut ch = channel(0);
        assert!(!ch.write_register(ExiRegister::DmaControl, control(EXI_READ, 4)));
        assert_ne!(ch.read_register(ExiRegister::DmaControl) & TSTART, 0);
        assert_eq!(ch.read_register(ExiRegister::Status) & TCINT, 0);
    }

    #[test]
    fn causing_interrupt_needs_flag_and_mask() {
        let mut ch = channel(2);
        ch.set_exi_int(true);
        assert!(!ch.is_causing_interrupt());
        ch.write_register(ExiRegister::Status, EXIINTMASK);
        assert!(ch.is_causing_interrupt());
        ch.write_register(ExiRegister::Status, EXIINT);
        assert!(!ch.is_causing_interrupt());
    }

    #[test]
    fn card_interrupt_latches_exiint() {
        let mut ch = channel(0);
        ch.add_device(DeviceType::MemoryCard, 0);
        ch.write_register(ExiRegister::Status, EXIINTMASK | EXTINT);
        assert!(!ch.is_causing_interrupt());
        ch.device_mut(0).set_interrupt(true);
        assert!(ch.is_causing_interrupt());
        ch.device_mut(0).set_interrupt(false);
        // Latched until software acknowledges it.
        assert!(ch.is_causing_interrupt());
    }

    #[test]
    fn registers_at_offsets_from_base() {
        let mut mapping = MmioMapping::new();
        channel(1).register_mmio(&mut mapping, 0x0D00_6814);
        assert_eq!(mapping.len(), 5);
        assert_eq!(
            mapping.lookup(0x0D00_6814 + 0x0C),
            Some(ExiMmio {
                channel: 1,
                register: ExiRegister::DmaControl
            })
        );
    }

    #[test]
    fn state_roundtrip_recreates_devices() {
        let mut saved = channel(0);
        saved.add_device(DeviceType::MemoryCard, 0);
        saved.add_device(DeviceType::Ethernet, 2);
        saved.write_register(ExiRegister::ImmData, 0x1234_5678);
        saved.device_mut(2).set_interrupt(true);

        let mut cursor = StateCursor::writer();
        saved.do_state(&mut cursor);
        let data = cursor.into_result().unwrap();

        let mut loaded = channel(0);
        let mut cursor = StateCursor::reader(data);
        loaded.do_state(&mut cursor);
        assert!(cursor.is_ok());

        assert_eq!(loaded.device(0).device_type(), DeviceType::MemoryCard);
        assert_eq!(loaded.device(2).device_type(), DeviceType::Ethernet);
        assert!(loaded.device(2).is_interrupt_set());
        assert_eq!(loaded.read_register(ExiRegister::ImmData), 0x1234_5678);
        assert_eq!(loaded.status, saved.status);
    }

    #[test]
    fn observable_paths() {
        let mut ch = channel(0);
        ch.add_device(DeviceType::MaskRom, 1);
        assert_eq!(ch.query("device1"), Some(Value::from("Mask ROM")));
        assert_eq!(ch.query("imm_data"), Some(Value::U32(0)));
        assert!(ch.query("bogus").is_none());
        for path in ch.query_paths() {
            assert!(ch.query(path).is_some(), "{path}");
        }
    }
}
