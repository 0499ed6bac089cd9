//! Portal metadata enrichment.
//!
//! Looks up the cycle metadata active at the time of the first metric seen
//! after startup (or after a control signal), caches its counters and
//! attaches them to steam, grind and notification measurements.

pub mod record;
pub mod source;

pub use record::{attach_rule, Attach, MetadataCache, MetadataRecord, PortalTag};
pub use source::{HttpMetadataSource, MetadataSource};

use crate::core::config::{MetadataConfig, DEFAULT_CONTROL_MEASUREMENT};
use crate::core::{CycleStatsError, Metric, Result};

/// Attaches cached portal metadata to passing metrics
pub struct MetadataEnricher {
    source: Box<dyn MetadataSource>,
    portal_tags: Vec<PortalTag>,
    control_measurement: String,
    cache: MetadataCache,
}

impl MetadataEnricher {
    /// Build an enricher backed by the HTTP portal lookup
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        let source = HttpMetadataSource::new(config)?;
        Self::new(Box::new(source), config.portal_tags.clone())
    }

    /// Build an enricher over any metadata source
    pub fn new(source: Box<dyn MetadataSource>, portal_tags: Vec<PortalTag>) -> Result<Self> {
        if portal_tags.is_empty() {
            return Err(CycleStatsError::config("no tags specified in configuration"));
        }

        tracing::info!("Initializing portal metadata enrichment");

        Ok(Self {
            source,
            portal_tags,
            control_measurement: DEFAULT_CONTROL_MEASUREMENT.to_string(),
            cache: MetadataCache::default(),
        })
    }

    /// Use a different control measurement name
    pub fn with_control_measurement<S: Into<String>>(mut self, name: S) -> Self {
        self.control_measurement = name.into();
        self
    }

    /// Enrich a batch in place and hand it back.
    ///
    /// Control signals clear the cache and pass through untouched so the
    /// grouping stage sees them as well.
    pub async fn apply(&mut self, mut batch: Vec<Metric>) -> Vec<Metric> {
        for metric in &mut batch {
            if metric.name() == self.control_measurement {
                tracing::debug!("Control signal received, clearing metadata cache");
                self.cache.clear();
                continue;
            }

            if self.cache.is_empty() {
                match self.source.fetch(metric.time()).await {
                    Ok(record) => {
                        tracing::debug!("Fetched metadata for cycle {}", record.id);
                        self.cache.set(&record);
                    },
                    Err(e) => {
                        tracing::warn!("Metadata lookup failed ({}): {}", e.category(), e);
                    },
                }
            }

            self.enrich(metric);
        }
        batch
    }

    fn enrich(&self, metric: &mut Metric) {
        for tag in &self.portal_tags {
            let Some(value) = self.cache.get(*tag).filter(|v| *v != 0) else {
                continue;
            };
            match attach_rule(*tag, metric.name()) {
                Some(Attach::Field) => metric.add_field(tag.as_str(), value),
                Some(Attach::Tag) => metric.add_tag(tag.as_str(), value.to_string()),
                None => {},
            }
        }
    }

    /// Current cache contents
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldValue;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct StaticSource {
        record: Option<MetadataRecord>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl MetadataSource for StaticSource {
        async fn fetch(&self, _timestamp: DateTime<Utc>) -> Result<MetadataRecord> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.record
                .clone()
                .ok_or_else(|| CycleStatsError::Http { status: 503 })
        }
    }

    fn enricher(record: Option<MetadataRecord>) -> (MetadataEnricher, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let source = StaticSource {
            record,
            calls: Arc::clone(&calls),
        };
        let tags = vec![PortalTag::Id, PortalTag::GrindCycle, PortalTag::SteamCycle];
        (MetadataEnricher::new(Box::new(source), tags).unwrap(), calls)
    }

    fn record() -> MetadataRecord {
        MetadataRecord {
            id: 17,
            steam_cycle: 12,
            grind_cycle: 0,
            ..MetadataRecord::default()
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_steam_enrichment() {
        let (mut enricher, calls) = enricher(Some(record()));
        let out = enricher.apply(vec![Metric::new("steam", ts())]).await;

        assert_eq!(out[0].get_field("steam_cycle"), Some(&FieldValue::Int(12)));
        assert_eq!(out[0].get_tag("id"), Some("17"));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_zero_values_not_attached() {
        let (mut enricher, _) = enricher(Some(record()));
        let out = enricher.apply(vec![Metric::new("grind", ts())]).await;

        assert!(!out[0].has_field("grind_cycle"));
        assert_eq!(out[0].get_tag("id"), Some("17"));
    }

    #[tokio::test]
    async fn test_fetch_once_until_control_signal() {
        let (mut enricher, calls) = enricher(Some(record()));
        enricher
            .apply(vec![Metric::new("steam", ts()), Metric::new("notification", ts())])
            .await;
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        let out = enricher
            .apply(vec![Metric::new("state_change", ts()), Metric::new("steam", ts())])
            .await;
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].tags().is_empty());
        assert!(out[0].fields().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_passes_through_and_retries() {
        let (mut enricher, calls) = enricher(None);
        let out = enricher
            .apply(vec![Metric::new("steam", ts()), Metric::new("steam", ts())])
            .await;

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m.fields().is_empty() && m.tags().is_empty()));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert!(enricher.cache().is_empty());
    }

    #[test]
    fn test_no_tags_rejected() {
        let source = StaticSource {
            record: None,
            calls: Arc::new(AtomicU32::new(0)),
        };
        assert!(MetadataEnricher::new(Box::new(source), Vec::new()).is_err());
    }
}
