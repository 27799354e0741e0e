//! Case series from the COVID Tracking Project states daily endpoint.
//!
//! The raw response body is cached on disk. With `refresh` off, an existing
//! cache file is reused and no request is made.

use super::{parse_date, CaseSource};
use crate::core::records::CaseRecord;
use crate::prelude::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

/// Default endpoint for the states daily series.
pub const DEFAULT_ENDPOINT: &str = "https://api.covidtracking.com/v1/states/daily.json";

#[derive(Debug, Deserialize)]
struct StatesDailyRow {
    date: serde_json::Value,
    state: String,
    positive: Option<i64>,
    negative: Option<i64>,
    pending: Option<i64>,
    hospitalized: Option<i64>,
    death: Option<i64>,
    total: Option<i64>,
}

impl StatesDailyRow {
    fn into_record(self) -> Result<CaseRecord> {
        let date = match &self.date {
            serde_json::Value::Number(n) => parse_date(&n.to_string())?,
            serde_json::Value::String(s) => parse_date(s)?,
            other => return Err(EpiError::Parse(format!("Unexpected date value {other}"))),
        };
        Ok(CaseRecord {
            state: self.state,
            date,
            positive: self.positive,
            negative: self.negative,
            pending: self.pending,
            hospitalized: self.hospitalized,
            death: self.death,
            total: self.total,
        })
    }
}

/// Remote case series with an on-disk cache of the last pull.
#[derive(Debug, Clone)]
pub struct CovidTrackingSource {
    endpoint: String,
    cache_path: PathBuf,
    refresh: bool,
    timeout: Duration,
}

impl CovidTrackingSource {
    /// Creates a source caching its pull at `cache_path`.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_path: cache_path.into(),
            refresh: false,
            timeout: Duration::from_secs(60),
        }
    }

    /// Re-fetch from the provider even when a cached pull exists.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let response = client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?.to_vec();
        info!(endpoint = %self.endpoint, bytes = body.len(), "Fetched case series");
        Ok(body)
    }

    /// Replaces the cached pull. Only called with a body that parsed.
    async fn store(&self, body: &[u8]) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.cache_path, body).await?;
        info!(cache = %self.cache_path.display(), "Cached case series");
        Ok(())
    }

    /// Parses a states daily JSON body.
    pub fn parse(body: &[u8]) -> Result<Vec<CaseRecord>> {
        let rows: Vec<StatesDailyRow> = serde_json::from_slice(body)?;
        rows.into_iter().map(StatesDailyRow::into_record).collect()
    }
}

#[async_trait]
impl CaseSource for CovidTrackingSource {
    #[instrument(skip(self), fields(source.type = "covid_tracking", refresh = self.refresh))]
    async fn load(&self) -> Result<Vec<CaseRecord>> {
        let cached = tokio::fs::try_exists(&self.cache_path).await?;
        let records = if self.refresh || !cached {
            let body = self.fetch().await?;
            let records = Self::parse(&body)?;
            self.store(&body).await?;
            records
        } else {
            info!(cache = %self.cache_path.display(), "Reusing cached case series");
            Self::parse(&tokio::fs::read(&self.cache_path).await?)?
        };
        info!(records = records.len(), "Loaded case series");
        Ok(records)
    }

    fn description(&self) -> String {
        format!("COVID Tracking states daily: {}", self.endpoint)
    }
}
