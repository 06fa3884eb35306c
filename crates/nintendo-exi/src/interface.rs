//! The expansion interface coordinator.
//!
//! Owns the three channels and drives everything that crosses channel
//! boundaries: startup provisioning, timed hot-swaps, interrupt
//! aggregation, register mapping, savestates and shutdown.
//!
//! Every entry point takes the [`System`] explicitly. Anything that mutates
//! hardware at a point in time goes through the virtual clock, so it runs
//! on the emulation strand in a deterministic order.

use emu_core::{EventType, FromThread, Observable, RemoteScheduler, StateCursor, Ticks, Value};

use crate::channel::{CHANNEL_REGISTER_BYTES, Channel, NUM_DEVICES};
use crate::device::{Device, DeviceType};
use crate::error::{ExiError, Result};
use crate::header::HeaderData;
use crate::processor_interface::ProcessorInterface;
use crate::slot::{MEMCARD_SLOTS, Slot, slot_to_exi_channel, slot_to_exi_device};
use crate::sram::Sram;
use crate::system::System;

/// Number of EXI channels.
pub const MAX_EXI_CHANNELS: usize = 3;

/// Physical address of channel 0's register block.
pub const EXI_BASE: u32 = 0x0C00_6800;

const CHANGE_DEVICE_EVENT: &str = "ChangeEXIDevice";
const UPDATE_INTERRUPTS_EVENT: &str = "EXIUpdateInterrupts";
const MEMCARD_CMD_DONE_EVENT: &str = "MemcardCmdDone";

/// Event userdata carries the session generation from this bit up.
const GENERATION_SHIFT: u32 = 40;
const PAYLOAD_MASK: u64 = (1 << GENERATION_SHIFT) - 1;

/// Event handles registered by [`init`].
#[derive(Debug, Clone, Copy)]
struct Events {
    change_device: EventType,
    update_interrupts: EventType,
    memcard_cmd_done: EventType,
}

/// Coordinator state.
#[derive(Debug, Default)]
pub struct ExpansionInterface {
    channels: Vec<Channel>,
    events: Option<Events>,
    generation: u16,
    using_overridden_sram: bool,
}

impl ExpansionInterface {
    /// Whether [`init`] has run without a matching [`shutdown`].
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.channels.len() == MAX_EXI_CHANNELS
    }

    /// SRAM was supplied by the caller and will not be written back.
    #[must_use]
    pub fn is_sram_overridden(&self) -> bool {
        self.using_overridden_sram
    }

    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Counts [`init`] calls. Events stamped with an older generation are
    /// dropped when they fire.
    #[must_use]
    pub fn generation(&self) -> u16 {
        self.generation
    }

    fn stamp(&self, payload: u64) -> u64 {
        stamp(self.generation, payload)
    }

    /// Payload of `userdata` if it belongs to the running session.
    fn current_payload(&self, userdata: u64, event: &str) -> Option<u64> {
        let generation = userdata >> GENERATION_SHIFT;
        if self.is_initialized() && generation == u64::from(self.generation) {
            Some(userdata & PAYLOAD_MASK)
        } else {
            log::debug!("Dropping {event} from EXI session {generation}");
            None
        }
    }
}

fn stamp(generation: u16, payload: u64) -> u64 {
    (u64::from(generation) << GENERATION_SHIFT) | (payload & PAYLOAD_MASK)
}

/// Scheduler payload for a device change.
///
/// Packed into the event userdata as `channel << 32 | type << 16 | num`,
/// so the channel and device number are 8 bits wide and the type 16. The
/// session generation is stamped above bit 40 when the event is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeDeviceToken {
    pub channel: u8,
    pub device_type: DeviceType,
    pub device_num: u8,
}

impl ChangeDeviceToken {
    #[must_use]
    pub const fn to_userdata(self) -> u64 {
        ((self.channel as u64) << 32)
            | ((self.device_type.as_u16() as u64) << 16)
            | self.device_num as u64
    }

    #[must_use]
    pub const fn from_userdata(userdata: u64) -> Self {
        Self {
            channel: (userdata >> 32) as u8,
            device_type: DeviceType::from_u16((userdata >> 16) as u16),
            device_num: userdata as u8,
        }
    }
}

/// Bring up the bus.
///
/// With `override_sram` the given image is used for the whole session and
/// never written back; otherwise SRAM is loaded from the configured path
/// and saved again by [`shutdown`].
pub fn init(system: &mut System, override_sram: Option<Sram>) {
    if let Some(sram) = override_sram {
        system.sram = sram;
        system.exi.using_overridden_sram = true;
    } else {
        system.sram = Sram::load_or_default(&system.config.sram_path);
        system.exi.using_overridden_sram = false;
    }
    system.exi.generation = system.exi.generation.wrapping_add(1);

    // Registered before any device goes in, so presence-change interrupt
    // updates raised while provisioning have a live event to land on.
    system.exi.events = Some(Events {
        change_device: system
            .timing
            .register_event(CHANGE_DEVICE_EVENT, change_device_callback),
        update_interrupts: system
            .timing
            .register_event(UPDATE_INTERRUPTS_EVENT, update_interrupts_callback),
        memcard_cmd_done: system
            .timing
            .register_event(MEMCARD_CMD_DONE_EVENT, memcard_cmd_done_callback),
    });

    let size_override = system.config.memory_card_size;
    let region = system.config.region;
    let host_time_secs = system.host_time_secs();
    let channels: Vec<Channel> = (0..MAX_EXI_CHANNELS as u32)
        .map(|i| {
            let header = HeaderData::new(&system.sram, size_override, region, host_time_secs, i);
            Channel::new(i, header)
        })
        .collect();
    system.exi.channels = channels;

    for slot in MEMCARD_SLOTS {
        add_memory_card(system, slot);
    }

    add_device(system, 0, 1, DeviceType::MaskRom);
    let serial_port_1 = system.config.serial_port_1;
    add_device(
        system,
        usize::from(slot_to_exi_channel(Slot::Sp1)),
        usize::from(slot_to_exi_device(Slot::Sp1)),
        serial_port_1,
    );
    add_device(system, 2, 0, DeviceType::Ad16);

    log::info!(
        "EXI initialised ({} SRAM)",
        if system.exi.using_overridden_sram { "overridden" } else { "owned" }
    );
}

/// Pick the device for a card slot, honouring an active replay.
fn add_memory_card(system: &mut System, slot: Slot) {
    let configured = system.config.device_for(slot);
    let device_type = if system.movie.enforces_config() {
        if system.movie.is_using_memcard(slot) {
            if !configured.is_memory_card() {
                system.alert(format!(
                    "The movie indicates that a memory card should be inserted into {slot}, \
                     but one is not currently inserted (instead, {configured} is inserted). \
                     For the movie to sync properly, please change the selected device to \
                     Memory Card or GCI Folder."
                ));
            }
            configured
        } else {
            DeviceType::None
        }
    } else {
        configured
    };

    add_device(
        system,
        usize::from(slot_to_exi_channel(slot)),
        usize::from(slot_to_exi_device(slot)),
        device_type,
    );
}

fn add_device(system: &mut System, channel: usize, num: usize, device_type: DeviceType) {
    let Some(ch) = system.exi.channels.get_mut(channel) else {
        log::error!("No EXI channel {channel}");
        return;
    };
    if ch.add_device(device_type, num) {
        schedule_update_interrupts(system, FromThread::Cpu, Ticks::ZERO);
    }
}

/// Tear down the bus, then write SRAM back unless it was overridden.
///
/// Channels are always reset, even when the write fails. Events still in
/// the queue fire into the void.
pub fn shutdown(system: &mut System) -> Result<()> {
    system.exi.channels.clear();
    system.exi.events = None;
    log::info!("EXI shut down");

    if system.exi.using_overridden_sram {
        return Ok(());
    }
    system.sram.save(&system.config.sram_path)
}

/// Save or load every channel, in channel order.
///
/// A load goes into copies of the channels, which replace the live ones
/// only if the whole pass succeeds.
pub fn do_state(system: &mut System, cursor: &mut StateCursor) -> Result<()> {
    cursor.do_marker("EXI");
    if cursor.is_reading() {
        let mut loaded = system.exi.channels.clone();
        for channel in &mut loaded {
            channel.do_state(cursor);
        }
        if cursor.is_ok() {
            system.exi.channels = loaded;
        }
    } else {
        for channel in &mut system.exi.channels {
            channel.do_state(cursor);
        }
    }
    if cursor.is_ok() {
        Ok(())
    } else {
        Err(ExiError::State("EXI state is truncated or corrupt"))
    }
}

/// Suspend (`lock`) or resume background device activity.
pub fn pause_and_lock(system: &mut System, lock: bool, unpause_on_unlock: bool) {
    for channel in &mut system.exi.channels {
        channel.pause_and_lock(lock, unpause_on_unlock);
    }
}

/// Map every channel's register block, channel `i` at `base + 20 * i`.
pub fn register_mmio(system: &mut System, base: u32) {
    let System { exi, mmio, .. } = system;
    for (i, channel) in exi.channels.iter().enumerate() {
        // The per-channel base is not block aligned: add, never OR.
        channel.register_mmio(mmio, base + CHANNEL_REGISTER_BYTES * i as u32);
    }
}

/// Swap the device in `slot` for one of `device_type`.
///
/// The slot reads empty from the next event onwards and the new device
/// appears one virtual second later.
pub fn change_device(system: &mut System, slot: Slot, device_type: DeviceType, from: FromThread) {
    change_device_at(
        system,
        slot_to_exi_channel(slot),
        slot_to_exi_device(slot),
        device_type,
        from,
    );
}

/// [`change_device`] by raw channel and device number.
///
/// Requests are never merged: overlapping swaps each deliver both of their
/// events, and whichever lands last wins.
pub fn change_device_at(
    system: &mut System,
    channel: u8,
    device_num: u8,
    device_type: DeviceType,
    from: FromThread,
) {
    let swap = swap_events(channel, device_num, device_type, system.ticks_per_second());
    let Some(events) = system.exi.events else {
        log::error!("EXI device change requested before init");
        return;
    };
    for (delay, token) in swap {
        let userdata = system.exi.stamp(token.to_userdata());
        system
            .timing
            .schedule_event(delay, events.change_device, userdata, from);
    }
}

/// The two events of a hot-swap: empty the slot now, insert the new
/// device one virtual second later.
fn swap_events(
    channel: u8,
    device_num: u8,
    device_type: DeviceType,
    ticks_per_second: Ticks,
) -> [(Ticks, ChangeDeviceToken); 2] {
    assert!(
        usize::from(channel) < MAX_EXI_CHANNELS,
        "EXI channel {channel} out of range"
    );
    assert!(
        usize::from(device_num) < NUM_DEVICES,
        "EXI device {device_num} out of range"
    );
    [
        (Ticks::ZERO, DeviceType::None),
        (ticks_per_second, device_type),
    ]
    .map(|(delay, device_type)| {
        let token = ChangeDeviceToken {
            channel,
            device_type,
            device_num,
        };
        (delay, token)
    })
}

fn change_device_callback(system: &mut System, userdata: u64, _cycles_late: i64) {
    let Some(payload) = system.exi.current_payload(userdata, CHANGE_DEVICE_EVENT) else {
        return;
    };
    let token = ChangeDeviceToken::from_userdata(payload);
    let num = usize::from(token.device_num);
    if num >= NUM_DEVICES {
        log::error!("Dropping device change for EXI device {num}");
        return;
    }
    add_device(system, usize::from(token.channel), num, token.device_type);
}

#[must_use]
pub fn get_channel(system: &System, index: usize) -> Option<&Channel> {
    system.exi.channel(index)
}

pub fn get_channel_mut(system: &mut System, index: usize) -> Option<&mut Channel> {
    system.exi.channel_mut(index)
}

/// Device currently in `slot`.
#[must_use]
pub fn get_device(system: &System, slot: Slot) -> Option<&Device> {
    system
        .exi
        .channel(usize::from(slot_to_exi_channel(slot)))?
        .get_device(1 << slot_to_exi_device(slot))
}

pub fn get_device_mut(system: &mut System, slot: Slot) -> Option<&mut Device> {
    system
        .exi
        .channel_mut(usize::from(slot_to_exi_channel(slot)))?
        .get_device_mut(1 << slot_to_exi_device(slot))
}

/// Recompute the EXI interrupt line.
///
/// Interrupts are wired unevenly: device 0 on channels 0 and 1 interrupts
/// its own channel, but device 2 on channel 0 (chip select 4, the serial
/// port) interrupts channel 2.
pub fn update_interrupts(system: &mut System) {
    let channels = &mut system.exi.channels;
    if channels.len() < MAX_EXI_CHANNELS {
        return;
    }

    let serial_port_int = channels[0]
        .get_device(4)
        .is_some_and(Device::is_interrupt_set);
    channels[2].set_exi_int(serial_port_int);

    // Every channel is polled: polling latches card interrupts.
    let mut cause = false;
    for channel in channels.iter_mut() {
        cause |= channel.is_causing_interrupt();
    }

    system
        .processor_interface
        .set_interrupt(ProcessorInterface::INT_CAUSE_EXI, cause);
}

fn update_interrupts_callback(system: &mut System, userdata: u64, _cycles_late: i64) {
    if system
        .exi
        .current_payload(userdata, UPDATE_INTERRUPTS_EVENT)
        .is_some()
    {
        update_interrupts(system);
    }
}

/// Queue an interrupt update `delay` ticks from now. Requests are never
/// coalesced.
pub fn schedule_update_interrupts(system: &mut System, from: FromThread, delay: Ticks) {
    let Some(events) = system.exi.events else {
        log::error!("EXI interrupt update requested before init");
        return;
    };
    let userdata = system.exi.stamp(0);
    system
        .timing
        .schedule_event(delay, events.update_interrupts, userdata, from);
}

/// Signal, `delay` ticks from now, that the card in `slot` finished a
/// command: the card's own interrupt line goes high and interrupts are
/// refreshed.
pub fn schedule_memcard_cmd_done(system: &mut System, slot: Slot, delay: Ticks) {
    let Some(events) = system.exi.events else {
        log::error!("Memory card command completion requested before init");
        return;
    };
    let userdata = system.exi.stamp(slot.index() as u64);
    system
        .timing
        .schedule_event(delay, events.memcard_cmd_done, userdata, FromThread::Cpu);
}

fn memcard_cmd_done_callback(system: &mut System, userdata: u64, _cycles_late: i64) {
    let Some(payload) = system.exi.current_payload(userdata, MEMCARD_CMD_DONE_EVENT) else {
        return;
    };
    let slot = u8::try_from(payload)
        .ok()
        .and_then(|raw| Slot::try_from(raw).ok())
        .unwrap_or(Slot::A);
    if let Some(card) = get_device_mut(system, slot).filter(|d| d.device_type().is_memory_card()) {
        card.set_interrupt(true);
    }
    update_interrupts(system);
}

/// Handle for requesting EXI changes from threads other than the
/// emulation strand. Requests are picked up at the next dispatch step.
#[derive(Clone)]
pub struct ExiRemote {
    scheduler: RemoteScheduler,
    change_device: EventType,
    update_interrupts: EventType,
    ticks_per_second: Ticks,
    generation: u16,
}

impl ExiRemote {
    /// See [`change_device`].
    pub fn change_device(&self, slot: Slot, device_type: DeviceType) {
        self.change_device_at(slot_to_exi_channel(slot), slot_to_exi_device(slot), device_type);
    }

    /// See [`change_device_at`].
    pub fn change_device_at(&self, channel: u8, device_num: u8, device_type: DeviceType) {
        let swap = swap_events(channel, device_num, device_type, self.ticks_per_second);
        for (delay, token) in swap {
            self.scheduler
                .schedule_event(delay, self.change_device, self.stamp(token.to_userdata()));
        }
    }

    pub fn schedule_update_interrupts(&self, delay: Ticks) {
        self.scheduler
            .schedule_event(delay, self.update_interrupts, self.stamp(0));
    }

    fn stamp(&self, payload: u64) -> u64 {
        stamp(self.generation, payload)
    }
}

/// A cross-thread handle, available between [`init`] and [`shutdown`].
///
/// The handle is bound to the session it was taken from: requests it makes
/// after a re-init are dropped.
#[must_use]
pub fn remote(system: &System) -> Option<ExiRemote> {
    let events = system.exi.events?;
    Some(ExiRemote {
        scheduler: system.timing.remote(),
        change_device: events.change_device,
        update_interrupts: events.update_interrupts,
        ticks_per_second: system.ticks_per_second(),
        generation: system.exi.generation,
    })
}

impl Observable for ExpansionInterface {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "channels" => Some(Value::U8(self.channels.len() as u8)),
            "sram_overridden" => Some(Value::Bool(self.using_overridden_sram)),
            _ => {
                let rest = path.strip_prefix("channel")?;
                let (index, field) = rest.split_once('.')?;
                let index: usize = index.parse().ok()?;
                self.channels.get(index)?.query(field)
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "channels",
            "sram_overridden",
            "channel0.status",
            "channel0.devices",
            "channel1.status",
            "channel1.devices",
            "channel2.status",
            "channel2.devices",
        ]
    }
}
