//! Core domain types, configuration and errors for cyclestats.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder};
pub use error::{CycleStatsError, Result};
pub use types::{FieldValue, Metric};
