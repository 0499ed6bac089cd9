//! Remote metadata lookup.

use crate::core::config::MetadataConfig;
use crate::core::{CycleStatsError, Result};
use crate::metadata::record::MetadataRecord;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

/// Anything able to resolve the cycle metadata active at a point in time
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the record for `timestamp`
    async fn fetch(&self, timestamp: DateTime<Utc>) -> Result<MetadataRecord>;
}

#[derive(Serialize)]
struct LookupBody {
    timestamp: String,
}

/// Portal lookup over HTTP: one POST per fetch
pub struct HttpMetadataSource {
    client: reqwest::Client,
    api_url: String,
    token: String,
    timeout: Duration,
}

impl HttpMetadataSource {
    /// Build a client from the metadata configuration
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        if config.api_url.is_empty() {
            return Err(CycleStatsError::config("metadata.api_url must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CycleStatsError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: format!("TOKEN {}", config.api_key),
            timeout: config.timeout,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> CycleStatsError {
        if err.is_timeout() {
            CycleStatsError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            CycleStatsError::parse(format!("invalid metadata response: {}", err))
        } else {
            CycleStatsError::network(format!("error during request: {}", err))
        }
    }
}

/// Timestamp wire format: UTC with millisecond precision and a `Z` suffix
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn fetch(&self, timestamp: DateTime<Utc>) -> Result<MetadataRecord> {
        let body = LookupBody {
            timestamp: format_timestamp(timestamp),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CycleStatsError::Http {
                status: status.as_u16(),
            });
        }

        response.json::<MetadataRecord>().await.map_err(|e| self.map_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.timestamp_opt(1_714_557_600, 123_456_789).unwrap();
        assert_eq!(format_timestamp(ts), "2024-05-01T10:00:00.123Z");

        let whole = Utc.timestamp_opt(1_714_557_600, 0).unwrap();
        assert_eq!(format_timestamp(whole), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_empty_url_rejected() {
        let config = MetadataConfig::default();
        assert!(HttpMetadataSource::new(&config).is_err());
    }
}
