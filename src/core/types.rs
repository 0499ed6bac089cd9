//! Metric data model: field values and tagged, timestamped metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value carried by a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag (door closed, jammed, ...)
    Bool(bool),
    /// Signed integer counter or code
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point measurement
    Float(f64),
    /// Free-form string
    Str(String),
}

impl FieldValue {
    /// Returns the value as a float when it is a float or a signed integer.
    ///
    /// Unsigned integers, booleans and strings are not considered numeric
    /// for minimum tracking.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns true if the value is a boolean
    pub fn is_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}i", v),
            FieldValue::UInt(v) => write!(f, "{}u", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInt(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

/// A named, tagged, timestamped set of field measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Measurement name (e.g. `steam_params`)
    name: String,
    /// Key-value tags
    #[serde(default)]
    tags: BTreeMap<String, String>,
    /// Key-value fields
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    /// Point in time of the measurement
    timestamp: DateTime<Utc>,
}

impl Metric {
    /// Creates a metric with no tags and no fields
    pub fn new<S: Into<String>>(name: S, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Builder-style tag insertion
    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.add_tag(key, value);
        self
    }

    /// Builder-style field insertion
    pub fn with_field<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.add_field(key, value);
        self
    }

    /// Measurement name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timestamp of the measurement
    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// All tags
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// All fields
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Gets a tag value by key
    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }

    /// Gets a field value by key
    pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns true if the metric carries the given field
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Adds or overwrites a field
    pub fn add_field<K: Into<String>, V: Into<FieldValue>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    /// Adds or overwrites a tag
    pub fn add_tag<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.tags.insert(key.into(), value.into());
    }

    /// Consumes the metric and returns its fields
    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (k, v) in &self.tags {
            write!(f, ",{}={}", k, v)?;
        }
        let mut sep = ' ';
        for (k, v) in &self.fields {
            write!(f, "{}{}={}", sep, k, v)?;
            sep = ',';
        }
        write!(f, " {}", self.timestamp.timestamp_nanos_opt().unwrap_or_default())
    }
}
