//! GameCube/Wii expansion interface (EXI).
//!
//! The EXI bus has three channels. Each channel exposes five 32-bit
//! registers and hosts up to three devices selected by chip select:
//!
//! | Channel | Device 0        | Device 1 | Device 2        |
//! |---------|-----------------|----------|-----------------|
//! | 0       | Slot A          | Mask ROM | Serial port 1   |
//! | 1       | Slot B          |          |                 |
//! | 2       | AD16            |          |                 |
//!
//! [`interface`] coordinates the channels: provisioning at startup, timed
//! hot-swaps on the virtual clock, interrupt aggregation, register mapping
//! and savestates. [`System`] is the context every entry point runs
//! against.

pub mod channel;
pub mod config;
pub mod device;
mod error;
pub mod header;
pub mod interface;
pub mod movie;
pub mod processor_interface;
pub mod slot;
pub mod sram;
pub mod system;

pub use channel::{Channel, ExiMmio, ExiRegister};
pub use config::{ExiConfig, Region};
pub use device::{Device, DeviceType};
pub use error::{ExiError, Result};
pub use header::HeaderData;
pub use interface::{ChangeDeviceToken, ExiRemote, ExpansionInterface};
pub use movie::MovieState;
pub use processor_interface::ProcessorInterface;
pub use slot::Slot;
pub use sram::Sram;
pub use system::System;
