//! Per-identity running minimum of numeric fields.

use crate::core::config::MinConfig;
use crate::core::Metric;
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Series identity: measurement name plus its full tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesId {
    name: String,
    tags: BTreeMap<String, String>,
}

/// Tracks the minimum of every float/int field per series over one period
#[derive(Debug)]
pub struct MinAggregator {
    series: AHashMap<SeriesId, BTreeMap<String, f64>>,
    period: Duration,
    suffix: String,
}

impl MinAggregator {
    /// Build from configuration
    pub fn new(config: &MinConfig) -> Self {
        Self {
            series: AHashMap::new(),
            period: config.period,
            suffix: config.suffix.clone(),
        }
    }

    /// Fold a metric into its series
    pub fn add(&mut self, metric: &Metric) {
        let id = SeriesId {
            name: metric.name().to_string(),
            tags: metric.tags().clone(),
        };
        let mins = self.series.entry(id).or_default();

        for (field, value) in metric.fields() {
            let Some(v) = value.as_f64() else {
                continue;
            };
            mins.entry(field.clone())
                .and_modify(|min| {
                    if v < *min {
                        *min = v;
                    }
                })
                .or_insert(v);
        }
    }

    /// Emit one metric per series with every field suffixed.
    ///
    /// Series that never carried a numeric field are skipped.
    pub fn push(&self, now: DateTime<Utc>) -> Vec<Metric> {
        self.series
            .iter()
            .filter(|(_, mins)| !mins.is_empty())
            .map(|(id, mins)| {
                let mut metric = Metric::new(id.name.clone(), now);
                for (k, v) in &id.tags {
                    metric.add_tag(k.clone(), v.clone());
                }
                for (field, min) in mins {
                    metric.add_field(format!("{}{}", field, self.suffix), *min);
                }
                metric
            })
            .collect()
    }

    /// Forget every series
    pub fn reset(&mut self) {
        self.series.clear();
    }

    /// Flush interval
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of tracked series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if no series is tracked
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
