//! The millisecond delay service BD needs during card bring-up.
//!
//! Out of scope per spec.md §1 ("Timer/delay service... consumed only
//! through the interfaces in §6"): this module only defines the interface,
//! not an implementation. A host wires in its own hardware timer.

/// A blocking millisecond delay source, consumed by the SD init FSM's
/// `OP_COND_LOOP` wait and by any bounded busy-poll deadline.
pub trait Timer {
    /// Blocks the calling task for approximately `ms` milliseconds.
    fn delay_ms(&self, ms: u32);

    /// Monotonic tick count in milliseconds, used to bound spin-polls
    /// (spec.md §5: SPI TX-empty/RX-not-empty, card busy-release, and
    /// data-token waits MUST be bounded by a deadline derived from this).
    fn uptime_ms(&self) -> u64;
}

/// A `Timer` usable only in tests: `delay_ms` is a no-op (RAM-disk tests run
/// with no actual card latency), and `uptime_ms` ticks forward by one
/// millisecond on every call, standing in for the real wall-clock time a
/// spin-poll burns even when nothing in the loop body calls `delay_ms`. This
/// keeps bounded busy-poll deadlines reachable in tests that deliberately
/// starve a poll (e.g. a data token that never arrives).
#[cfg(any(test, feature = "std"))]
pub struct NullTimer {
    now: core::cell::Cell<u64>,
}

#[cfg(any(test, feature = "std"))]
impl NullTimer {
    pub fn new() -> Self {
        NullTimer {
            now: core::cell::Cell::new(0),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for NullTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl Timer for NullTimer {
    fn delay_ms(&self, ms: u32) {
        self.now.set(self.now.get() + ms as u64);
    }

    fn uptime_ms(&self) -> u64 {
        let next = self.now.get() + 1;
        self.now.set(next);
        next
    }
}
