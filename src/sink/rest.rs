//! REST sink
//!
//! Inserts records into a PostgREST-style collection endpoint
//! (`POST {base_url}/rest/v1/{collection}` with a JSON array body), which is
//! the shape Supabase exposes for table inserts.
//!
//! # Example
//!
//! ```rust,ignore
//! use rollcall::config::SinkConfig;
//! use rollcall::sink::{RemoteSink, RestSink};
//!
//! let sink = RestSink::new(&SinkConfig {
//!     url: "https://abc.supabase.co".into(),
//!     api_key: Some("anon-key".into()),
//!     ..Default::default()
//! })?;
//! sink.submit_batch(&records).await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use super::{RemoteError, RemoteSink};
use crate::config::SinkConfig;
use crate::models::AttendanceRecord;
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::truncate_text;

/// Max characters of a remote error body kept in [`RemoteError::Http`]
const MAX_ERROR_BODY: usize = 512;

/// One inserted row; `id` is left out for tables that generate their own key
#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    rfid_tag: &'a str,
    status: &'a str,
    timestamp: String,
    date: NaiveDate,
}

impl<'a> InsertRow<'a> {
    fn new(record: &'a AttendanceRecord, with_id: bool) -> Self {
        Self {
            id: with_id.then(|| record.id()),
            rfid_tag: record.tag(),
            status: record.status().as_str(),
            timestamp: record.timestamp_iso(),
            date: record.date(),
        }
    }
}

/// HTTP sink for a single collection
pub struct RestSink {
    client: Client,
    endpoint: String,
    idempotent: bool,
    retry: RetryConfig,
}

impl RestSink {
    /// Create a sink from configuration
    pub fn new(config: &SinkConfig) -> Result<Self, RemoteError> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(RemoteError::InvalidConfig(format!(
                "sink URL must start with http:// or https://: {}",
                config.url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let apikey = HeaderValue::from_str(key)
                .map_err(|e| RemoteError::InvalidConfig(format!("invalid api key: {e}")))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| RemoteError::InvalidConfig(format!("invalid api key: {e}")))?;
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(format!("rollcall/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::InvalidConfig(e.to_string()))?;

        let endpoint = format!(
            "{}/rest/v1/{}",
            config.url.trim_end_matches('/'),
            config.collection
        );

        Ok(Self {
            client,
            endpoint,
            idempotent: config.idempotent,
            retry: RetryConfig::new(
                config.max_retries,
                config.retry_base_delay(),
                config.retry_base_delay().saturating_mul(8),
            ),
        })
    }

    /// Full insert endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_once(&self, records: &[AttendanceRecord]) -> Result<(), RemoteError> {
        let rows: Vec<InsertRow<'_>> = records
            .iter()
            .map(|record| InsertRow::new(record, self.idempotent))
            .collect();
        let mut request = self.client.post(&self.endpoint).json(&rows);

        if self.idempotent {
            request = request
                .query(&[("on_conflict", "id")])
                .header("Prefer", "return=minimal,resolution=ignore-duplicates");
        } else {
            request = request.header("Prefer", "return=minimal");
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Http {
            status: status.as_u16(),
            message: truncate_text(&body, MAX_ERROR_BODY),
        })
    }
}

#[async_trait]
impl RemoteSink for RestSink {
    fn name(&self) -> &str {
        "rest"
    }

    async fn submit_batch(&self, records: &[AttendanceRecord]) -> Result<(), RemoteError> {
        if records.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            batch_size = records.len(),
            "Submitting batch"
        );

        with_retry_if(
            &self.retry,
            || self.post_once(records),
            RemoteError::is_transient,
        )
        .await
    }
}
