//! Message, stderr, and fetch ring buffers (§3, §4.3, §5).
//!
//! Buffers reset on reconnect; timestamps survive across reconnects because
//! they're stamped at insert time from the wall clock, not derived from any
//! per-connection counter.

use std::time::{SystemTime, UNIX_EPOCH};

use inspector_types::RingBuffer;

use crate::event::{FetchEntry, MessageEntry, StderrEntry};

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The three history buffers a session keeps, bundled so `disconnect()` and
/// `reconnect()` can treat them uniformly (reset on reconnect, preserved
/// across disconnect per §5).
pub struct Histories {
    pub messages: RingBuffer<MessageEntry>,
    pub stderr: RingBuffer<StderrEntry>,
    pub fetch: RingBuffer<FetchEntry>,
}

impl Histories {
    pub fn new(message_capacity: usize, stderr_capacity: usize, fetch_capacity: usize) -> Self {
        Self {
            messages: RingBuffer::new(message_capacity),
            stderr: RingBuffer::new(stderr_capacity),
            fetch: RingBuffer::new(fetch_capacity),
        }
    }

    /// Drop all entries but keep configured capacities, for the reconnect
    /// path (§4.3: "the buffers reset on reconnect").
    pub fn reset(&mut self) {
        self.messages.clear();
        self.stderr.clear();
        self.fetch.clear();
    }
}
