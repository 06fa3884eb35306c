//! Memory-mapped register routing.

use std::collections::BTreeMap;

/// Maps 32-bit register addresses to handler tags.
///
/// The mapping holds no register state. Each component registers a tag of
/// its own choosing for every register it owns, and the system that owns
/// the mapping dispatches accesses to the component named by the tag.
#[derive(Debug, Clone)]
pub struct MmioMapping<T> {
    handlers: BTreeMap<u32, T>,
}

impl<T: Copy> MmioMapping<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` for the register at `address`. Registering the
    /// same address again replaces the previous handler.
    pub fn register(&mut self, address: u32, handler: T) {
        self.handlers.insert(address, handler);
    }

    /// Handler for an exact register address.
    #[must_use]
    pub fn lookup(&self, address: u32) -> Option<T> {
        self.handlers.get(&address).copied()
    }

    /// Number of registered registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T: Copy> Default for MmioMapping<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_exact() {
        let mut mapping = MmioMapping::new();
        mapping.register(0x1000, 'a');
        mapping.register(0x1004, 'b');
        assert_eq!(mapping.lookup(0x1000), Some('a'));
        assert_eq!(mapping.lookup(0x1004), Some('b'));
        assert_eq!(mapping.lookup(0x1002), None);
    }

    #[test]
    fn reregistering_replaces() {
        let mut mapping = MmioMapping::new();
        mapping.register(0x20, 1u8);
        mapping.register(0x20, 2u8);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.lookup(0x20), Some(2));
    }
}
