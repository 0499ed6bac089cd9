//! Periodic aggregators fed with processed metrics.

pub mod min;

pub use min::MinAggregator;
