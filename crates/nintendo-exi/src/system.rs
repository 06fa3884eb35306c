//! The system context that owns the expansion interface and everything it
//! talks to.
//!
//! There is no global instance: every coordinator entry point in
//! [`crate::interface`] takes `&mut System`, and every scheduled event is
//! delivered with the same `&mut System`.

use emu_core::{CoreTiming, MasterClock, MmioMapping, Ticks};

use crate::channel::ExiMmio;
use crate::config::ExiConfig;
use crate::interface::{self, ExpansionInterface};
use crate::movie::MovieState;
use crate::processor_interface::ProcessorInterface;
use crate::sram::Sram;

/// GameCube CPU clock: 486 MHz.
pub const GAMECUBE_CLOCK: MasterClock = MasterClock::new(486_000_000);

/// Emulated console, reduced to what the expansion interface needs.
pub struct System {
    pub timing: CoreTiming<System>,
    pub clock: MasterClock,
    pub processor_interface: ProcessorInterface,
    pub sram: Sram,
    pub config: ExiConfig,
    pub movie: MovieState,
    pub mmio: MmioMapping<ExiMmio>,
    pub exi: ExpansionInterface,
    /// Host wall-clock time in seconds since 1970, sampled once at
    /// construction so card headers are reproducible.
    host_time_secs: u64,
    alerts: Vec<String>,
}

impl System {
    /// A powered-off system. Call [`interface::init`] to bring up the bus.
    #[must_use]
    pub fn new(config: ExiConfig, movie: MovieState, host_time_secs: u64) -> Self {
        Self {
            timing: CoreTiming::new(),
            clock: GAMECUBE_CLOCK,
            processor_interface: ProcessorInterface::new(),
            sram: Sram::default(),
            config,
            movie,
            mmio: MmioMapping::new(),
            exi: ExpansionInterface::default(),
            host_time_secs,
            alerts: Vec::new(),
        }
    }

    #[must_use]
    pub fn host_time_secs(&self) -> u64 {
        self.host_time_secs
    }

    /// One second of virtual time.
    #[must_use]
    pub fn ticks_per_second(&self) -> Ticks {
        self.clock.ticks_per_second()
    }

    /// Run every event due within the next `ticks`, in order.
    pub fn advance(&mut self, ticks: Ticks) {
        let target = self.timing.now() + ticks;
        while let Some(event) = self.timing.pop_due(target) {
            log::trace!("Firing {} at {}", event.name, self.timing.now().get());
            event.fire(self);
        }
        self.timing.advance_to(target);
    }

    /// Show a non-fatal warning to the user.
    pub fn alert(&mut self, message: String) {
        log::warn!("{message}");
        self.alerts.push(message);
    }

    /// Drain warnings raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// CPU read of a memory-mapped register. Unmapped addresses read 0.
    pub fn read32(&mut self, address: u32) -> u32 {
        let Some(ExiMmio { channel, register }) = self.mmio.lookup(address) else {
            log::debug!("Unmapped MMIO read at {address:#010x}");
            return 0;
        };
        self.exi
            .channel_mut(usize::from(channel))
            .map_or(0, |ch| ch.read_register(register))
    }

    /// CPU write of a memory-mapped register. Unmapped writes are dropped.
    pub fn write32(&mut self, address: u32, value: u32) {
        let Some(ExiMmio { channel, register }) = self.mmio.lookup(address) else {
            log::debug!("Unmapped MMIO write at {address:#010x} <- {value:#010x}");
            return;
        };
        let needs_update = self
            .exi
            .channel_mut(usize::from(channel))
            .is_some_and(|ch| ch.write_register(register, value));
        if needs_update {
            interface::update_interrupts(self);
        }
    }
}
