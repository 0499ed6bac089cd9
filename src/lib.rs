//! cyclestats - cycle telemetry post-processing.
//!
//! Appliance cycle controllers report a cycle as a burst of partial
//! measurements sharing a name and an instant: one metric per field, or a
//! few fields at a time. cyclestats condenses each burst back into a single
//! completed report.
//!
//! # Features
//!
//! - **Cycle grouping**: metrics keyed by measurement name and whole second
//! - **Completeness table**: per-measurement required fields decide when a
//!   report is whole
//! - **Control signal**: a `state_change` metric discards pending groups
//! - **Portal metadata**: optional enrichment with cycle counters over HTTP
//! - **Minimum aggregation**: periodic per-series minimums of numeric fields
//!
//! # Architecture
//!
//! - `processor`: the grouping engine
//! - `metadata`: portal metadata enrichment
//! - `aggregator`: periodic minimum aggregator
//! - `pipeline`: stage wiring and the single-owner task
//! - `core`: metric model, configuration and errors
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use cyclestats_lib::core::Metric;
//! use cyclestats_lib::core::config::GroupingConfig;
//! use cyclestats_lib::processor::CycleProcessor;
//!
//! let mut processor = CycleProcessor::new(&GroupingConfig::default()).unwrap();
//! let now = Utc::now();
//! let reports = processor.apply(vec![
//!     Metric::new("vessel_lid_failures", now).with_field("lid_open_count", 2i64),
//!     Metric::new("vessel_lid_failures", now).with_field("lid_lock_failures", 0i64),
//! ]);
//! assert_eq!(reports.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod aggregator;
pub mod cli;
pub mod core;
pub mod metadata;
pub mod pipeline;
pub mod processor;

// Re-export core types for convenience
pub use crate::core::{Config, Metric, Result};
pub use crate::pipeline::{Pipeline, PipelineHandle};
pub use crate::processor::CycleProcessor;
