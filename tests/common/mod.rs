//! Common test utilities and fixtures.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cyclestats_lib::core::config::GroupingConfig;
use cyclestats_lib::core::{FieldValue, Metric};
use cyclestats_lib::processor::CycleProcessor;
use std::collections::BTreeMap;

/// Base instant used by fixtures (2024-05-01T10:00:00Z).
pub const BASE_SECS: i64 = 1_714_557_600;

/// Timestamp `secs` after the base instant plus `millis`.
pub fn at(secs: i64, millis: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_SECS + secs, millis * 1_000_000).unwrap()
}

/// Test fixture builder for creating metrics with sensible defaults.
pub struct TestMetricBuilder {
    name: String,
    secs: i64,
    millis: u32,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl TestMetricBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            secs: 0,
            millis: 0,
            tags: vec![("device".to_string(), "unit-1".to_string())],
            fields: Vec::new(),
        }
    }

    pub fn at(mut self, secs: i64, millis: u32) -> Self {
        self.secs = secs;
        self.millis = millis;
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn field<V: Into<FieldValue>>(mut self, key: &str, value: V) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn build(self) -> Metric {
        let mut metric = Metric::new(self.name, at(self.secs, self.millis));
        for (k, v) in self.tags {
            metric.add_tag(k, v);
        }
        for (k, v) in self.fields {
            metric.add_field(k, v);
        }
        metric
    }
}

/// Build a required-field table from literals.
pub fn table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(m, f)| (m.to_string(), f.iter().map(|s| s.to_string()).collect()))
        .collect()
}

/// Processor over a custom table with match-all grouping.
pub fn processor(entries: &[(&str, &[&str])]) -> CycleProcessor {
    CycleProcessor::new(&GroupingConfig {
        required_fields: table(entries),
        ..GroupingConfig::default()
    })
    .unwrap()
}

/// Find the aggregate with the given name.
pub fn find<'a>(metrics: &'a [Metric], name: &str) -> &'a Metric {
    metrics
        .iter()
        .find(|m| m.name() == name)
        .unwrap_or_else(|| panic!("no aggregate named {}", name))
}
