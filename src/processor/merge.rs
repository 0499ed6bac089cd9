//! Collapse a group buffer into one aggregate metric.

use crate::core::Metric;

/// Merge buffered metrics into a single aggregate.
///
/// The first metric provides name, tags and timestamp. Fields of later
/// metrics are written on top, so the last writer wins on collisions. Tags
/// of later metrics are ignored. Returns `None` only for an empty buffer.
pub fn merge<I>(metrics: I) -> Option<Metric>
where
    I: IntoIterator<Item = Metric>,
{
    let mut metrics = metrics.into_iter();
    let mut aggregate = metrics.next()?;
    for metric in metrics {
        for (key, value) in metric.into_fields() {
            aggregate.add_field(key, value);
        }
    }
    Some(aggregate)
}
