//! Error type for the expansion interface.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExiError>;

#[derive(Debug, Error)]
pub enum ExiError {
    #[error("SRAM I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid slot index {0}")]
    InvalidSlot(u8),

    #[error("savestate: {0}")]
    State(&'static str),

    #[cfg(feature = "native")]
    #[error("invalid EXI configuration: {0}")]
    Config(#[from] serde_json::Error),
}
