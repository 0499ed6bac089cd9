//! Cycle grouping engine.
//!
//! - `grouping`: group key computation and measurement globs
//! - `fields`: required-field table per measurement
//! - `cache`: per-key metric buffers
//! - `merge`: buffer to aggregate collapse
//! - `cycle`: the batch driver tying them together

pub mod cache;
pub mod cycle;
pub mod fields;
pub mod grouping;
pub mod merge;
pub mod shared;

pub use cache::{GroupBuffer, GroupCache};
pub use cycle::{CycleProcessor, CycleState, CycleStats};
pub use fields::{default_required_fields, FieldRequirements};
pub use grouping::{group_key, GroupKey, GroupKeyer};
pub use merge::merge;
pub use shared::SharedCycleProcessor;
