//! HTTPS client for the research-data warehouse.

use crate::codec::FramePayload;
use crate::error::{DataError, Result};
use crate::warehouse::{TableQuery, Warehouse, WarehouseConfig};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Pause before the single retry of a transiently failed request.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Wire form of a table query.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    table: &'a str,
    columns: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<String>,
}

impl<'a> QueryRequest<'a> {
    fn from_query(query: &'a TableQuery) -> Self {
        let frequency = match query {
            TableQuery::SecurityMaster { frequency, .. }
            | TableQuery::RiskFree { frequency, .. } => Some(frequency.code().to_string()),
            _ => None,
        };
        Self {
            table: query.table(),
            columns: query.columns(),
            start: query.range().map(|r| r.start.to_string()),
            end: query.range().map(|r| r.end.to_string()),
            frequency,
        }
    }
}

/// Spaces requests out to the configured minimum interval.
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

/// Read-only warehouse client with rate limiting and a single retry.
#[derive(Debug)]
pub struct WarehouseClient {
    http: reqwest::Client,
    config: WarehouseConfig,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl WarehouseClient {
    /// Create a client from a configuration.
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DataError::Network)?;
        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(config.rate_limit)));
        Ok(Self {
            http,
            config,
            rate_limiter,
        })
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(WarehouseConfig::from_env()?)
    }

    async fn post_once(&self, request: &QueryRequest<'_>) -> Result<DataFrame> {
        self.rate_limiter.lock().await.wait().await;

        let response = self
            .http
            .post(&self.config.url)
            .basic_auth(&self.config.user, Some(&self.config.token))
            .json(request)
            .send()
            .await
            .map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::Warehouse(format!(
                "{} query failed: HTTP {}",
                request.table,
                response.status()
            )));
        }

        let payload: FramePayload = response
            .json()
            .await
            .map_err(|e| DataError::Parse(format!("{} response: {e}", request.table)))?;
        payload.to_frame()
    }

    async fn post_query(&self, query: &TableQuery) -> Result<DataFrame> {
        let request = QueryRequest::from_query(query);
        match self.post_once(&request).await {
            Ok(frame) => Ok(frame),
            // Retry once on transport failures; anything else is final.
            Err(DataError::Network(_)) => {
                sleep(RETRY_BACKOFF).await;
                self.post_once(&request).await
            }
            Err(other) => Err(other),
        }
    }
}

impl Warehouse for WarehouseClient {
    async fn fetch(&self, query: &TableQuery) -> Result<DataFrame> {
        self.post_query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::DateRange;
    use chrono::NaiveDate;

    #[test]
    fn request_serializes_window_and_frequency() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(1963, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
        )
        .unwrap();
        let query = TableQuery::SecurityMaster {
            range,
            frequency: crate::Frequency::Monthly,
        };
        let request = QueryRequest::from_query(&query);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["table"], "security_master");
        assert_eq!(json["start"], "1963-07-01");
        assert_eq!(json["frequency"], "M");
    }

    #[test]
    fn link_table_request_omits_window() {
        let request = QueryRequest::from_query(&TableQuery::LinkTable);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("start").is_none());
        assert!(json.get("frequency").is_none());
    }

    #[test]
    fn client_builds_from_explicit_config() {
        let config = WarehouseConfig::new("https://example.test/query", "researcher", "secret");
        assert!(WarehouseClient::new(config).is_ok());
    }
}
