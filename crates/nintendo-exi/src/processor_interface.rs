//! Interrupt cause register of the processor interface.

/// Interrupt controller model: one latched line per cause bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorInterface {
    cause: u32,
}

impl ProcessorInterface {
    /// Expansion interface interrupt line.
    pub const INT_CAUSE_EXI: u32 = 0x10;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert or clear the lines in `cause`.
    pub fn set_interrupt(&mut self, cause: u32, asserted: bool) {
        if asserted {
            self.cause |= cause;
        } else {
            self.cause &= !cause;
        }
    }

    /// Current interrupt cause register.
    #[must_use]
    pub fn cause(&self) -> u32 {
        self.cause
    }

    #[must_use]
    pub fn is_asserted(&self, cause: u32) -> bool {
        self.cause & cause != 0
    }
}
