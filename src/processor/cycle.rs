//! Cycle report processor.
//!
//! Consumes batches of partial measurements, buffers them per group key and
//! emits merged cycle reports once a group has collected as many metrics as
//! its measurement has required fields. A completed group flushes the whole
//! cache, including groups that are still incomplete.

use crate::core::config::GroupingConfig;
use crate::core::{Metric, Result};
use crate::processor::cache::GroupCache;
use crate::processor::fields::FieldRequirements;
use crate::processor::grouping::{GroupKey, GroupKeyer};
use crate::processor::merge::merge;
use std::time::{Duration, Instant};

/// Lifecycle state of the processor between batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Nothing buffered
    Idle,
    /// At least one group buffered, none complete yet
    Accumulating,
}

/// Counters describing what happened to consumed metrics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Metrics added to the group cache
    pub buffered: u64,
    /// Metrics without any required field, or of an unknown measurement
    pub dropped_irrelevant: u64,
    /// Metrics whose group key could not be computed
    pub dropped_unkeyed: u64,
    /// Control signals received
    pub resets: u64,
    /// Cache flushes performed
    pub flushes: u64,
    /// Aggregate metrics produced by flushes
    pub aggregates_emitted: u64,
}

/// Groups same-instant partial metrics into completed cycle reports
#[derive(Debug)]
pub struct CycleProcessor {
    keyer: GroupKeyer,
    requirements: FieldRequirements,
    cache: GroupCache,
    control_measurement: String,
    max_group_age: Option<Duration>,
    stats: CycleStats,
}

impl CycleProcessor {
    /// Build a processor from the grouping configuration.
    ///
    /// Fails if no grouping pattern compiles or the field table is invalid.
    pub fn new(config: &GroupingConfig) -> Result<Self> {
        let keyer = GroupKeyer::new(&config.group_by)?;
        let requirements = FieldRequirements::new(&config.required_fields)?;

        tracing::info!(
            "Cycle processor ready: {} measurements, {} grouping patterns",
            requirements.len(),
            config.group_by.len()
        );

        Ok(Self {
            keyer,
            requirements,
            cache: GroupCache::new(),
            control_measurement: config.control_measurement.clone(),
            max_group_age: config.max_group_age,
            stats: CycleStats::default(),
        })
    }

    /// Process one batch, returning the aggregates of a flush or nothing.
    ///
    /// Every input metric is consumed: it is either buffered or dropped and
    /// never handed back as itself.
    pub fn apply(&mut self, batch: Vec<Metric>) -> Vec<Metric> {
        self.apply_at(batch, Instant::now())
    }

    /// Same as [`apply`](Self::apply) with an explicit clock for new groups
    pub fn apply_at(&mut self, batch: Vec<Metric>, now: Instant) -> Vec<Metric> {
        let mut trigger: Option<(GroupKey, usize)> = None;

        for metric in batch {
            if metric.name() == self.control_measurement {
                tracing::debug!("Control signal received, discarding {} groups", self.cache.len());
                self.cache.reset();
                self.stats.resets += 1;
                trigger = None;
                continue;
            }

            let Some(threshold) = self.requirements.threshold(metric.name()) else {
                tracing::debug!("Dropping metric with unknown measurement: {}", metric.name());
                self.stats.dropped_irrelevant += 1;
                continue;
            };

            if !self.requirements.is_relevant(&metric) {
                tracing::debug!("Dropping {} without required fields", metric.name());
                self.stats.dropped_irrelevant += 1;
                continue;
            }

            let key = match self.keyer.key(&metric) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!("Dropping metric: {}", e);
                    self.stats.dropped_unkeyed += 1;
                    continue;
                },
            };

            self.cache.put_at(key.clone(), metric, now);
            self.stats.buffered += 1;
            trigger = Some((key, threshold));
        }

        match trigger {
            Some((key, threshold)) if self.cache.count(&key) >= threshold => {
                tracing::debug!("Group {} complete with {} metrics", key, self.cache.count(&key));
                self.flush()
            },
            _ => Vec::new(),
        }
    }

    /// Flush the whole cache if its oldest group exceeds the configured age.
    ///
    /// Does nothing unless `max_group_age` is configured.
    pub fn expire(&mut self, now: Instant) -> Vec<Metric> {
        let (Some(max_age), Some(oldest)) = (self.max_group_age, self.cache.oldest()) else {
            return Vec::new();
        };

        if now.saturating_duration_since(oldest) < max_age {
            return Vec::new();
        }

        tracing::debug!("Forcing flush of {} stale groups", self.cache.len());
        self.flush()
    }

    /// Drain every buffered group and merge each into one aggregate
    pub fn flush(&mut self) -> Vec<Metric> {
        if self.cache.is_empty() {
            return Vec::new();
        }

        let aggregates: Vec<Metric> = self
            .cache
            .flush_all()
            .into_iter()
            .filter_map(|(_, buffer)| merge(buffer))
            .collect();

        self.stats.flushes += 1;
        self.stats.aggregates_emitted += aggregates.len() as u64;
        tracing::debug!("Flushed {} aggregates", aggregates.len());

        aggregates
    }

    /// Discard all buffered groups
    pub fn reset(&mut self) {
        self.cache.reset();
    }

    /// Current lifecycle state
    pub fn state(&self) -> CycleState {
        if self.cache.is_empty() {
            CycleState::Idle
        } else {
            CycleState::Accumulating
        }
    }

    /// Number of groups currently buffered
    pub fn pending_groups(&self) -> usize {
        self.cache.len()
    }

    /// Number of metrics currently buffered across all groups
    pub fn pending_metrics(&self) -> usize {
        self.cache.buffered()
    }

    /// Processing counters since construction
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// The field requirements in use
    pub fn requirements(&self) -> &FieldRequirements {
        &self.requirements
    }
}
