//! Required-field table for cycle reports.

use crate::core::{CycleStatsError, Metric, Result};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Built-in cycle report layout per controller subsystem
const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    (
        "steam_params",
        &["setpoint_temperature", "setpoint_pressure", "hold_time", "cycle_type"],
    ),
    (
        "steam_stats",
        &[
            "max_temperature",
            "min_temperature",
            "avg_temperature",
            "max_pressure",
            "min_pressure",
            "duration",
        ],
    ),
    ("vessel_status", &["door_closed", "door_locked", "water_level", "temperature"]),
    ("system_status", &["state", "mode", "error_code", "uptime"]),
    ("grinder", &["motor_current", "speed", "runtime", "jammed"]),
    ("vessel_lid_failures", &["lid_open_count", "lid_lock_failures"]),
];

/// The built-in table in configuration form
pub fn default_required_fields() -> BTreeMap<String, Vec<String>> {
    DEFAULT_TABLE
        .iter()
        .map(|(name, fields)| {
            (name.to_string(), fields.iter().map(|f| f.to_string()).collect())
        })
        .collect()
}

/// Measurement name -> fields that complete its cycle report.
///
/// Read-only once built.
#[derive(Debug, Clone)]
pub struct FieldRequirements {
    table: AHashMap<String, Vec<String>>,
}

impl FieldRequirements {
    /// Build from a configured table
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut out = AHashMap::with_capacity(table.len());
        for (measurement, fields) in table {
            if fields.is_empty() {
                return Err(CycleStatsError::config(format!(
                    "required_fields for '{}' must list at least one field",
                    measurement
                )));
            }
            out.insert(measurement.clone(), fields.clone());
        }
        Ok(Self { table: out })
    }

    /// Required fields for a measurement, if it participates in grouping
    pub fn required(&self, measurement: &str) -> Option<&[String]> {
        self.table.get(measurement).map(Vec::as_slice)
    }

    /// Number of buffered metrics that completes a group for `measurement`
    pub fn threshold(&self, measurement: &str) -> Option<usize> {
        self.required(measurement).map(<[String]>::len)
    }

    /// Returns true if the metric carries at least one required field
    pub fn is_relevant(&self, metric: &Metric) -> bool {
        self.required(metric.name())
            .is_some_and(|fields| fields.iter().any(|f| metric.has_field(f)))
    }

    /// Number of configured measurements
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no measurement is configured
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for FieldRequirements {
    fn default() -> Self {
        Self {
            table: default_required_fields().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_table() {
        let reqs = FieldRequirements::default();
        assert_eq!(reqs.len(), 6);
        assert_eq!(reqs.threshold("steam_params"), Some(4));
        assert_eq!(reqs.threshold("vessel_lid_failures"), Some(2));
        assert_eq!(reqs.threshold("notification"), None);
        assert_eq!(default_required_fields().len(), reqs.len());
    }

    #[test]
    fn test_relevance() {
        let mut table = BTreeMap::new();
        table.insert("steam".to_string(), vec!["a".to_string(), "b".to_string()]);
        let reqs = FieldRequirements::new(&table).unwrap();

        let relevant = Metric::new("steam", Utc::now()).with_field("b", 2i64);
        let irrelevant = Metric::new("steam", Utc::now()).with_field("c", 3i64);
        let unknown = Metric::new("grind", Utc::now()).with_field("a", 1i64);

        assert!(reqs.is_relevant(&relevant));
        assert!(!reqs.is_relevant(&irrelevant));
        assert!(!reqs.is_relevant(&unknown));
    }

    #[test]
    fn test_empty_field_list_rejected() {
        let mut table = BTreeMap::new();
        table.insert("steam".to_string(), Vec::new());
        assert!(FieldRequirements::new(&table).is_err());
    }
}
