//! Data-bus latch for unmapped reads.
//!
//! The 2A03 data bus floats when no device drives it, so a read from an
//! address without a reader returns whatever value was last on the bus. Every
//! completed read (mapped or not) refreshes the latch.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OpenBus {
    value: u8,
}

impl OpenBus {
    pub(crate) fn new() -> Self {
        Self { value: 0 }
    }

    /// Current floating value.
    pub(crate) fn sample(&self) -> u8 {
        self.value
    }

    /// Latches a freshly driven value.
    pub(crate) fn latch(&mut self, value: u8) {
        self.value = value;
    }

    pub(crate) fn reset(&mut self) {
        self.value = 0;
    }
}
