//! Group cache: key -> insertion-ordered buffer of raw metrics.

use crate::core::Metric;
use crate::processor::grouping::GroupKey;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::time::Instant;

/// Inline capacity of a group buffer; cycle reports rarely exceed it
const INLINE_GROUP: usize = 4;

/// Metrics buffered under one key, oldest first
pub type GroupBuffer = SmallVec<[Metric; INLINE_GROUP]>;

#[derive(Debug)]
struct Group {
    opened_at: Instant,
    metrics: GroupBuffer,
}

/// Buffers metrics per group key until the next flush or reset.
///
/// A key is present only while at least one metric is buffered under it.
/// Flushing always drains every group at once.
#[derive(Debug, Default)]
pub struct GroupCache {
    groups: AHashMap<GroupKey, Group>,
    buffered: usize,
}

impl GroupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metric to the buffer for `key`, returning the buffer's new length
    pub fn put(&mut self, key: GroupKey, metric: Metric) -> usize {
        self.put_at(key, metric, Instant::now())
    }

    /// Same as [`put`](Self::put) with an explicit open time for new groups
    pub fn put_at(&mut self, key: GroupKey, metric: Metric, now: Instant) -> usize {
        let group = self.groups.entry(key).or_insert_with(|| Group {
            opened_at: now,
            metrics: GroupBuffer::new(),
        });
        group.metrics.push(metric);
        self.buffered += 1;
        group.metrics.len()
    }

    /// Number of metrics buffered under `key`
    pub fn count(&self, key: &GroupKey) -> usize {
        self.groups.get(key).map_or(0, |g| g.metrics.len())
    }

    /// Drain every group, leaving the cache empty
    pub fn flush_all(&mut self) -> Vec<(GroupKey, GroupBuffer)> {
        self.buffered = 0;
        self.groups
            .drain()
            .map(|(key, group)| (key, group.metrics))
            .collect()
    }

    /// Discard all buffered groups
    pub fn reset(&mut self) {
        self.groups.clear();
        self.buffered = 0;
    }

    /// Open time of the oldest group
    pub fn oldest(&self) -> Option<Instant> {
        self.groups.values().map(|g| g.opened_at).min()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total metrics buffered across all groups
    pub fn buffered(&self) -> usize {
        self.buffered
    }
}
