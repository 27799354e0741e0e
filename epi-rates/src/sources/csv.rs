//! Local CSV loaders.
//!
//! Files are read through DataFusion with an explicit schema, so empty fields
//! load as nulls ("unreported") rather than failing type inference.

use super::{expand_globs, parse_date, value_at, BatchColumns, CaseSource, DemographicSource};
use crate::columns as col;
use crate::core::context::{CsvLayout, EpiContext, EpiContextConfig};
use crate::core::records::{CaseRecord, DemographicRecord};
use crate::prelude::*;
use arrow::array::Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, instrument};

/// Reads a CSV header line to find which columns a file provides.
fn header_columns(path: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut header = String::new();
    BufReader::new(File::open(Path::new(path))?).read_line(&mut header)?;
    let header = header.trim_start_matches('\u{feff}');
    Ok(header
        .trim_end_matches(['\r', '\n'])
        .split(delimiter as char)
        .map(|name| name.trim().trim_matches('"').to_string())
        .collect())
}

/// Case series from one or more CSV files.
///
/// Expected columns: `date` (`YYYYMMDD` or `YYYY-MM-DD`), `state` (postal
/// abbreviation) and the count columns `positive`, `negative`, `pending`,
/// `hospitalized`, `death`, `total`. Count columns absent from the file load
/// as unreported; extra columns are ignored.
///
/// # Examples
///
/// ```rust,no_run
/// use epi_rates::sources::{CaseSource, CsvCaseSource};
///
/// # async fn example() -> epi_rates::prelude::Result<()> {
/// let source = CsvCaseSource::new("data/states_daily.csv")?;
/// let cases = source.load().await?;
/// println!("{} case records", cases.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvCaseSource {
    paths: Vec<String>,
    layout: CsvLayout,
    context: EpiContextConfig,
}

impl CsvCaseSource {
    /// Creates a source from a single file path.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Self::from_paths(vec![path.into()])
    }

    /// Creates a source from multiple file paths.
    pub fn from_paths(paths: Vec<String>) -> Result<Self> {
        if paths.is_empty() {
            return Err(EpiError::Configuration(
                "At least one path must be provided".to_string(),
            ));
        }
        Ok(Self {
            paths,
            layout: CsvLayout::default(),
            context: EpiContextConfig::default(),
        })
    }

    /// Creates a source from a glob pattern.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        Self::from_paths(expand_globs(&[pattern.into()])?)
    }

    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.layout.delimiter = delimiter;
        self
    }

    /// Sets the DataFusion context configuration used while reading.
    pub fn with_context_config(mut self, context: EpiContextConfig) -> Self {
        self.context = context;
        self
    }

    fn schema(&self) -> Result<Schema> {
        let available = header_columns(&self.paths[0], self.layout.delimiter)?;
        let mut fields = Vec::with_capacity(available.len());
        for name in &available {
            let data_type = if col::CASE_COUNTS.contains(&name.as_str()) {
                DataType::Float64
            } else {
                DataType::Utf8
            };
            fields.push(Field::new(name, data_type, true));
        }
        for required in [col::DATE, col::STATE] {
            if !available.iter().any(|name| name == required) {
                return Err(EpiError::ColumnNotFound {
                    column: required.to_string(),
                });
            }
        }
        Ok(Schema::new(fields))
    }

    fn records_from_batch(batch: &RecordBatch, out: &mut Vec<CaseRecord>) -> Result<()> {
        let columns = BatchColumns::new(batch);
        let dates = columns.strings(col::DATE)?;
        let states = columns.strings(col::STATE)?;
        let counts = col::CASE_COUNTS
            .iter()
            .map(|name| columns.optional_whole_numbers(name))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            if dates.is_null(row) || states.is_null(row) {
                return Err(EpiError::Parse(format!(
                    "Case row {row} is missing its date or state"
                )));
            }
            let date = parse_date(dates.value(row))?;
            let mut record = CaseRecord::new(states.value(row).trim(), date);
            for (slot, column) in record.counts_mut().into_iter().zip(&counts) {
                *slot = column.as_ref().and_then(|array| value_at(array, row));
            }
            out.push(record);
        }
        Ok(())
    }
}

#[async_trait]
impl CaseSource for CsvCaseSource {
    #[instrument(skip(self), fields(source.type = "csv", source.files = self.paths.len()))]
    async fn load(&self) -> Result<Vec<CaseRecord>> {
        let schema = self.schema()?;
        let ctx = EpiContext::with_config(self.context.clone())?;
        let batches = ctx.read_csv(&self.paths, &schema, self.layout).await?;

        let mut records = Vec::new();
        for batch in &batches {
            Self::records_from_batch(batch, &mut records)?;
        }

        info!(records = records.len(), source = %self.description(), "Loaded case series");
        Ok(records)
    }

    fn description(&self) -> String {
        if self.paths.len() == 1 {
            let path = &self.paths[0];
            format!("CSV case series: {path}")
        } else {
            let count = self.paths.len();
            format!("CSV case series: {count} files")
        }
    }
}

/// Demographic estimates from a CSV file.
///
/// Only the `state` column (FIPS code) is required. `name`, `population`,
/// `median_age_male`, `median_age_female` and the count columns listed in
/// [`crate::columns::DEMOGRAPHIC_COUNTS`] are read when present.
#[derive(Debug, Clone)]
pub struct CsvDemographicSource {
    path: String,
    layout: CsvLayout,
    context: EpiContextConfig,
}

impl CsvDemographicSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            layout: CsvLayout::default(),
            context: EpiContextConfig::default(),
        }
    }

    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.layout.delimiter = delimiter;
        self
    }

    /// Sets the DataFusion context configuration used while reading.
    pub fn with_context_config(mut self, context: EpiContextConfig) -> Self {
        self.context = context;
        self
    }

    fn schema(&self) -> Result<Schema> {
        let available = header_columns(&self.path, self.layout.delimiter)?;
        if !available.iter().any(|name| name == col::STATE) {
            return Err(EpiError::ColumnNotFound {
                column: col::STATE.to_string(),
            });
        }

        let fields = available
            .iter()
            .map(|name| {
                let data_type = match name.as_str() {
                    col::MEDIAN_AGE_MALE | col::MEDIAN_AGE_FEMALE | col::POPULATION => {
                        DataType::Float64
                    }
                    other if col::DEMOGRAPHIC_COUNTS.contains(&other) => DataType::Float64,
                    _ => DataType::Utf8,
                };
                Field::new(name, data_type, true)
            })
            .collect::<Vec<_>>();
        Ok(Schema::new(fields))
    }

    fn records_from_batch(batch: &RecordBatch, out: &mut Vec<DemographicRecord>) -> Result<()> {
        let columns = BatchColumns::new(batch);
        let states = columns.strings(col::STATE)?;
        let names = match batch.column_by_name("name") {
            Some(_) => Some(columns.strings("name")?),
            None => None,
        };
        let population = columns.optional_whole_numbers(col::POPULATION)?;
        let age_male = columns.optional_floats(col::MEDIAN_AGE_MALE)?;
        let age_female = columns.optional_floats(col::MEDIAN_AGE_FEMALE)?;
        let counts = col::DEMOGRAPHIC_COUNTS
            .iter()
            .map(|name| columns.optional_whole_numbers(name))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            if states.is_null(row) {
                return Err(EpiError::Parse(format!(
                    "Demographic row {row} is missing its state code"
                )));
            }
            let mut record = DemographicRecord::new(
                states.value(row).trim(),
                population.as_ref().and_then(|a| value_at(a, row)),
            );
            record.name = names
                .as_ref()
                .filter(|a| !a.is_null(row))
                .map(|a| a.value(row).to_string());
            record.median_age_male = age_male.as_ref().and_then(|a| value_at(a, row));
            record.median_age_female = age_female.as_ref().and_then(|a| value_at(a, row));
            for (slot, column) in record.counts_mut().into_iter().zip(&counts) {
                *slot = column.as_ref().and_then(|array| value_at(array, row));
            }
            out.push(record);
        }
        Ok(())
    }
}

#[async_trait]
impl DemographicSource for CsvDemographicSource {
    #[instrument(skip(self), fields(source.type = "csv", source.path = %self.path))]
    async fn load(&self) -> Result<Vec<DemographicRecord>> {
        let schema = self.schema()?;
        let ctx = EpiContext::with_config(self.context.clone())?;
        let batches = ctx
            .read_csv(std::slice::from_ref(&self.path), &schema, self.layout)
            .await?;

        let mut records = Vec::new();
        for batch in &batches {
            Self::records_from_batch(batch, &mut records)?;
        }

        info!(records = records.len(), source = %self.description(), "Loaded demographics");
        Ok(records)
    }

    fn description(&self) -> String {
        format!("CSV demographics: {}", self.path)
    }
}
