//! Demographics from the Census Bureau ACS 5-year estimates API.

use super::DemographicSource;
use crate::core::records::DemographicRecord;
use crate::credentials::load_api_key;
use crate::prelude::*;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default ACS 5-year endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.census.gov/data/2018/acs/acs5";

/// Requested ACS variables and the record field each one fills.
pub const CENSUS_VARIABLES: &[(&str, &str)] = &[
    ("B01003_001E", "population"),
    ("B01002_002E", "median_age_male"),
    ("B01002_003E", "median_age_female"),
    ("B02001_002E", "white"),
    ("B02001_003E", "black"),
    ("B02001_004E", "american_indian"),
    ("B02001_005E", "asian"),
    ("B03003_003E", "hispanic"),
    ("B08301_003E", "commute_drove_alone"),
    ("B08301_004E", "commute_carpooled"),
    ("B08301_010E", "commute_public_transit"),
    ("B08301_019E", "commute_walked"),
    ("B08301_021E", "commute_worked_from_home"),
    ("B27010_017E", "uninsured"),
];

/// Remote demographic estimates keyed by FIPS code.
#[derive(Debug, Clone)]
pub struct CensusSource {
    endpoint: String,
    api_key_path: PathBuf,
    timeout: Duration,
}

impl CensusSource {
    /// Creates a source that reads its API key from `api_key_path` on load.
    pub fn new(api_key_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_path: api_key_path.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn requested_fields() -> String {
        std::iter::once("NAME")
            .chain(CENSUS_VARIABLES.iter().map(|(variable, _)| *variable))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parses an ACS array-of-arrays body whose first row is the header.
    ///
    /// Negative values are the API's annotation sentinels and load as null.
    pub fn parse(body: &[u8]) -> Result<Vec<DemographicRecord>> {
        let table: Vec<Vec<Option<String>>> = serde_json::from_slice(body)?;
        let mut rows = table.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| EpiError::data_source("Census", "Response has no header row"))?;
        let header: Vec<String> = header.into_iter().map(Option::unwrap_or_default).collect();

        let position = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| EpiError::ColumnNotFound {
                    column: name.to_string(),
                })
        };
        let state_at = position("state")?;
        let name_at = position("NAME").ok();
        let variable_at = CENSUS_VARIABLES
            .iter()
            .map(|&(variable, field)| position(variable).map(|at| (at, field)))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::new();
        for row in rows {
            let cell = |at: usize| row.get(at).cloned().flatten();
            let state = cell(state_at)
                .ok_or_else(|| EpiError::data_source("Census", "Row without a state code"))?;

            let mut record = DemographicRecord {
                state,
                name: name_at.and_then(cell),
                ..Default::default()
            };
            for (at, field) in &variable_at {
                assign(&mut record, field, cell(*at).as_deref())?;
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn parse_count(field: &str, value: Option<&str>) -> Result<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => {
            let parsed = v
                .parse::<f64>()
                .map_err(|e| EpiError::Parse(format!("Invalid {field} value '{v}': {e}")))?;
            Ok((parsed >= 0.0).then_some(parsed.round() as i64))
        }
    }
}

fn parse_measure(field: &str, value: Option<&str>) -> Result<Option<f64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => {
            let parsed = v
                .parse::<f64>()
                .map_err(|e| EpiError::Parse(format!("Invalid {field} value '{v}': {e}")))?;
            Ok((parsed >= 0.0).then_some(parsed))
        }
    }
}

fn assign(record: &mut DemographicRecord, field: &str, value: Option<&str>) -> Result<()> {
    match field {
        "population" => record.population = parse_count(field, value)?,
        "median_age_male" => record.median_age_male = parse_measure(field, value)?,
        "median_age_female" => record.median_age_female = parse_measure(field, value)?,
        "white" => record.white = parse_count(field, value)?,
        "black" => record.black = parse_count(field, value)?,
        "american_indian" => record.american_indian = parse_count(field, value)?,
        "asian" => record.asian = parse_count(field, value)?,
        "hispanic" => record.hispanic = parse_count(field, value)?,
        "commute_drove_alone" => record.commute_drove_alone = parse_count(field, value)?,
        "commute_carpooled" => record.commute_carpooled = parse_count(field, value)?,
        "commute_public_transit" => record.commute_public_transit = parse_count(field, value)?,
        "commute_walked" => record.commute_walked = parse_count(field, value)?,
        "commute_worked_from_home" => {
            record.commute_worked_from_home = parse_count(field, value)?
        }
        "uninsured" => record.uninsured = parse_count(field, value)?,
        other => {
            return Err(EpiError::Internal(format!(
                "No demographic field named '{other}'"
            )))
        }
    }
    Ok(())
}

#[async_trait]
impl DemographicSource for CensusSource {
    #[instrument(skip(self), fields(source.type = "census", endpoint = %self.endpoint))]
    async fn load(&self) -> Result<Vec<DemographicRecord>> {
        let key = load_api_key(&self.api_key_path)?;
        let client = Client::builder().timeout(self.timeout).build()?;

        let response = client
            .get(&self.endpoint)
            .query(&[
                ("get", Self::requested_fields().as_str()),
                ("for", "state:*"),
                ("key", key.expose()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "Census request failed");
            return Err(EpiError::data_source(
                "Census",
                format!("Request failed with status {status}"),
            ));
        }
        let body = response.bytes().await?;

        let records = Self::parse(&body)?;
        info!(records = records.len(), "Loaded demographics");
        Ok(records)
    }

    fn description(&self) -> String {
        format!("Census ACS estimates: {}", self.endpoint)
    }
}
