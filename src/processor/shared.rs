//! Mutually exclusive access to a cycle processor shared between threads.

use crate::core::Metric;
use crate::processor::cycle::{CycleProcessor, CycleStats};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Cloneable handle serializing every call into one [`CycleProcessor`].
///
/// The processor itself is single-owner; this wrapper guarantees two hosts
/// never run `apply` on it at the same time.
#[derive(Clone)]
pub struct SharedCycleProcessor {
    inner: Arc<Mutex<CycleProcessor>>,
}

impl SharedCycleProcessor {
    /// Wrap a processor
    pub fn new(processor: CycleProcessor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(processor)),
        }
    }

    /// Process one batch under the lock
    pub fn apply(&self, batch: Vec<Metric>) -> Vec<Metric> {
        self.inner.lock().apply(batch)
    }

    /// Expire stale groups under the lock
    pub fn expire(&self, now: Instant) -> Vec<Metric> {
        self.inner.lock().expire(now)
    }

    /// Discard all buffered groups
    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Processing counters
    pub fn stats(&self) -> CycleStats {
        self.inner.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GroupingConfig;
    use chrono::{TimeZone, Utc};
    use std::thread;

    #[test]
    fn test_concurrent_batches_are_serialized() {
        let shared = SharedCycleProcessor::new(CycleProcessor::new(&GroupingConfig::default()).unwrap());
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let metric = Metric::new("grinder", t).with_field("speed", f64::from(i));
                    shared.apply(vec![metric])
                })
            })
            .collect();

        let emitted: usize = handles.into_iter().map(|h| h.join().unwrap().len()).sum();

        // Four grinder metrics in one second complete exactly one report
        assert_eq!(emitted, 1);
        assert_eq!(shared.stats().buffered, 4);
        assert_eq!(shared.stats().flushes, 1);
    }
}
