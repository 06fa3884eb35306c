//! Core types for cycle-accurate emulation.
//!
//! Everything ticks at the master crystal frequency. All component timing
//! derives from this, and every timed state change is delivered by the
//! virtual-clock scheduler. No exceptions.

mod clock;
mod mmio;
mod observable;
mod savestate;
mod scheduler;
mod ticks;

pub use clock::MasterClock;
pub use mmio::MmioMapping;
pub use observable::{Observable, Value};
pub use savestate::StateCursor;
pub use scheduler::{CoreTiming, DueEvent, EventCallback, EventType, FromThread, RemoteScheduler};
pub use ticks::Ticks;
