//! Configuration management for cyclestats.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{CycleStatsError, Result};
use crate::metadata::PortalTag;
use crate::processor::fields::default_required_fields;
use crate::processor::grouping::GroupKeyer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Measurement name reserved for the cache reset control signal
pub const DEFAULT_CONTROL_MEASUREMENT: &str = "state_change";

/// Complete configuration for cyclestats
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Cycle grouping configuration
    pub grouping: GroupingConfig,
    /// Metadata enrichment configuration
    pub metadata: MetadataConfig,
    /// Minimum aggregator configuration
    pub min: MinConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Cycle grouping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Glob patterns of measurement names that may be grouped
    pub group_by: Vec<String>,
    /// Measurement name -> fields that make a cycle report complete
    pub required_fields: BTreeMap<String, Vec<String>>,
    /// Measurement name that resets all buffered groups
    pub control_measurement: String,
    /// Force a flush once the oldest group has been open this long
    #[serde(with = "humantime_serde")]
    pub max_group_age: Option<Duration>,
}

/// Metadata enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Enable the metadata stage
    pub enabled: bool,
    /// Endpoint receiving the timestamp lookup
    pub api_url: String,
    /// Token sent in the Authorization header
    pub api_key: String,
    /// Metadata values to attach to metrics
    pub portal_tags: Vec<PortalTag>,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Minimum aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinConfig {
    /// Enable the minimum aggregator
    pub enabled: bool,
    /// Flush interval
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    /// Suffix appended to every emitted field name
    pub suffix: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Structured logging format
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-metric tracing
    Trace,
    /// Dropped metrics and flushes
    Debug,
    /// Startup and configuration
    Info,
    /// Recoverable failures
    Warn,
    /// Errors only
    Error,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        GroupingConfig {
            group_by: vec!["*".to_string()],
            required_fields: default_required_fields(),
            control_measurement: DEFAULT_CONTROL_MEASUREMENT.to_string(),
            max_group_age: None,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            enabled: false,
            api_url: String::new(),
            api_key: String::new(),
            portal_tags: vec![PortalTag::Id, PortalTag::GrindCycle, PortalTag::SteamCycle],
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for MinConfig {
    fn default() -> Self {
        MinConfig {
            enabled: true,
            period: Duration::from_secs(30),
            suffix: "_min".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Grouping validation
        if self.grouping.group_by.is_empty() {
            return Err(CycleStatsError::config("group_by must contain at least one pattern"));
        }
        GroupKeyer::new(&self.grouping.group_by)?;

        if self.grouping.control_measurement.is_empty() {
            return Err(CycleStatsError::config("control_measurement must not be empty"));
        }

        for (measurement, fields) in &self.grouping.required_fields {
            if measurement.is_empty() {
                return Err(CycleStatsError::config("required_fields contains an empty measurement name"));
            }
            if fields.is_empty() {
                return Err(CycleStatsError::config(format!(
                    "required_fields for '{}' must list at least one field",
                    measurement
                )));
            }
            if fields.iter().any(String::is_empty) {
                return Err(CycleStatsError::config(format!(
                    "required_fields for '{}' contains an empty field name",
                    measurement
                )));
            }
        }

        if self.grouping.max_group_age == Some(Duration::ZERO) {
            return Err(CycleStatsError::config("max_group_age must be greater than 0"));
        }

        // Metadata validation
        if self.metadata.enabled {
            if self.metadata.api_url.is_empty() {
                return Err(CycleStatsError::config("metadata.api_url is required when metadata is enabled"));
            }
            if self.metadata.portal_tags.is_empty() {
                return Err(CycleStatsError::config("no tags specified in configuration"));
            }
        }

        // Min aggregator validation
        if self.min.enabled && self.min.period.is_zero() {
            return Err(CycleStatsError::config("min.period must be greater than 0"));
        }

        Ok(())
    }

    /// Render a commented sample configuration
    pub fn sample() -> String {
        let mut out = String::from(
            "## Cycle grouping\n\
             grouping:\n\
             \x20 ## Measurement name globs eligible for grouping\n\
             \x20 group_by: [\"*\"]\n\
             \x20 ## Control measurement that discards all buffered groups\n\
             \x20 control_measurement: state_change\n\
             \x20 ## Optional forced flush for groups that never complete\n\
             \x20 # max_group_age: 5m\n\
             \x20 ## Fields that make each measurement's cycle report complete\n\
             \x20 required_fields:\n",
        );
        for (measurement, fields) in default_required_fields() {
            out.push_str(&format!("    {}: [{}]\n", measurement, fields.join(", ")));
        }
        out.push_str(
            "\n## Portal metadata enrichment\n\
             metadata:\n\
             \x20 enabled: false\n\
             \x20 api_url: \"https://portal.example/api/cycles/lookup\"\n\
             \x20 api_key: \"\"\n\
             \x20 timeout: 10s\n\
             \x20 ## Available tags to attach to metrics:\n",
        );
        for tag in PortalTag::ALL {
            out.push_str(&format!("  ## * {}\n", tag.as_str()));
        }
        out.push_str(
            "  portal_tags: [id, grind_cycle, steam_cycle]\n\
             \n## Per-identity minimum of numeric fields\n\
             min:\n\
             \x20 enabled: true\n\
             \x20 period: 30s\n\
             \x20 suffix: _min\n\
             \nlogging:\n\
             \x20 level: info\n\
             \x20 structured: false\n",
        );
        out
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| CycleStatsError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set grouping patterns
    pub fn group_by<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.grouping.group_by = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the required-field table
    pub fn required_fields(mut self, table: BTreeMap<String, Vec<String>>) -> Self {
        self.config.grouping.required_fields = table;
        self
    }

    /// Set the forced-flush age
    pub fn max_group_age(mut self, age: Duration) -> Self {
        self.config.grouping.max_group_age = Some(age);
        self
    }

    /// Enable metadata enrichment against the given endpoint
    pub fn metadata_endpoint<U: Into<String>, K: Into<String>>(mut self, url: U, api_key: K) -> Self {
        self.config.metadata.enabled = true;
        self.config.metadata.api_url = url.into();
        self.config.metadata.api_key = api_key.into();
        self
    }

    /// Set the attached metadata tags
    pub fn portal_tags(mut self, tags: Vec<PortalTag>) -> Self {
        self.config.metadata.portal_tags = tags;
        self
    }

    /// Enable or disable the minimum aggregator
    pub fn min_enabled(mut self, enabled: bool) -> Self {
        self.config.min.enabled = enabled;
        self
    }

    /// Set the minimum aggregator period
    pub fn min_period(mut self, period: Duration) -> Self {
        self.config.min.period = period;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
