//! Query ids for outgoing contract messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time-seeded, strictly increasing 64-bit query ids.
///
/// Each id is the current Unix time in milliseconds, bumped past the previous
/// id when the clock has not moved, so ids never repeat within a process.
#[derive(Debug, Default)]
pub struct QueryIdSource {
    last: AtomicU64,
}

impl QueryIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.wrapping_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.wrapping_add(1))
    }
}
