//! Result sinks for the metrics table.
//!
//! [`metrics_batch`] turns [`MetricRow`]s into an Arrow [`RecordBatch`] whose
//! columns follow [`crate::columns`]; [`CsvSink`] writes that batch with
//! Arrow's CSV writer. Null values are written as empty fields.

use crate::columns as col;
use crate::core::records::MetricRow;
use crate::prelude::*;
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// What a sink reports back after writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReceipt {
    pub destination: String,
    pub rows_written: usize,
    pub bytes_written: usize,
    /// Hex SHA-256 of the written bytes
    pub sha256: String,
}

/// Serializes the final metrics table.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Writes `rows` to `destination`, replacing any previous content.
    async fn write(&self, rows: &[MetricRow], destination: &Path) -> Result<SinkReceipt>;
}

/// Options for [`CsvSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkOptions {
    /// Prepend a zero-based `row` index column
    pub include_index: bool,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            include_index: true,
            delimiter: b',',
        }
    }
}

/// Writes the metrics table as delimited text with a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvSink {
    options: SinkOptions,
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SinkOptions) -> Self {
        Self { options }
    }

    /// Renders `rows` to CSV bytes without touching the filesystem.
    pub fn render(&self, rows: &[MetricRow]) -> Result<Vec<u8>> {
        let mut batch = metrics_batch(rows)?;
        if self.options.include_index {
            batch = with_index_column(&batch)?;
        }

        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(self.options.delimiter)
            .build(Vec::new());
        writer.write(&batch)?;
        Ok(writer.into_inner())
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    #[instrument(skip(self, rows), fields(rows = rows.len(), destination = %destination.display()))]
    async fn write(&self, rows: &[MetricRow], destination: &Path) -> Result<SinkReceipt> {
        let bytes = self.render(rows)?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, &bytes).await?;

        let receipt = SinkReceipt {
            destination: destination.display().to_string(),
            rows_written: rows.len(),
            bytes_written: bytes.len(),
            sha256: hex::encode(Sha256::digest(&bytes)),
        };
        info!(
            rows = receipt.rows_written,
            bytes = receipt.bytes_written,
            sha256 = %receipt.sha256,
            "Wrote metrics table"
        );
        Ok(receipt)
    }
}

/// Arrow schema of the metrics table.
pub fn metrics_schema() -> Schema {
    let mut fields = vec![
        Field::new(col::STATE, DataType::Utf8, false),
        Field::new(col::STATE_FIPS, DataType::Utf8, false),
        Field::new(col::STATE_NAME, DataType::Utf8, false),
        Field::new(col::DATE, DataType::Date32, false),
    ];
    fields.extend(
        col::CASE_COUNTS
            .iter()
            .map(|name| Field::new(*name, DataType::Int64, false)),
    );
    fields.push(Field::new(col::POPULATION, DataType::Int64, false));
    fields.push(Field::new(col::MEDIAN_AGE_MALE, DataType::Float64, true));
    fields.push(Field::new(col::MEDIAN_AGE_FEMALE, DataType::Float64, true));
    fields.extend(
        col::DEMOGRAPHIC_COUNTS
            .iter()
            .map(|name| Field::new(*name, DataType::Int64, true)),
    );
    fields.extend([
        Field::new(col::FIRST_CASE_DATE, DataType::Date32, true),
        Field::new(col::DAYS_SINCE_FIRST_CASE, DataType::Int64, true),
        Field::new(col::POSITIVE_PER_100K, DataType::Float64, false),
        Field::new(col::DEATH_PER_100K, DataType::Float64, false),
        Field::new(col::DECAY_MULTIPLIER, DataType::Float64, true),
        Field::new(col::ADJUSTED_POSITIVE_PER_100K, DataType::Float64, true),
        Field::new(col::ADJUSTED_DEATH_PER_100K, DataType::Float64, true),
    ]);
    Schema::new(fields)
}

/// Builds the metrics table as a single Arrow batch.
pub fn metrics_batch(rows: &[MetricRow]) -> Result<RecordBatch> {
    let strings = |f: &dyn Fn(&MetricRow) -> String| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
    };
    let ints = |f: &dyn Fn(&MetricRow) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(rows.iter().map(f)))
    };
    let opt_ints = |f: &dyn Fn(&MetricRow) -> Option<i64>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Int64Array>())
    };
    let floats = |f: &dyn Fn(&MetricRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
    };
    let opt_floats = |f: &dyn Fn(&MetricRow) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    };

    let mut columns: Vec<ArrayRef> = vec![
        strings(&|r| r.state.abbreviation().to_string()),
        strings(&|r| r.state.fips_code()),
        strings(&|r| r.state.name().to_string()),
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| date32(r.date)),
        )),
        ints(&|r| r.counts.positive),
        ints(&|r| r.counts.negative),
        ints(&|r| r.counts.pending),
        ints(&|r| r.counts.hospitalized),
        ints(&|r| r.counts.death),
        ints(&|r| r.counts.total),
        // Rows only exist for positive populations.
        ints(&|r| r.demographics.population.unwrap_or_default()),
        opt_floats(&|r| r.demographics.median_age_male),
        opt_floats(&|r| r.demographics.median_age_female),
    ];
    for index in 0..col::DEMOGRAPHIC_COUNTS.len() {
        columns.push(opt_ints(&|r| r.demographics.counts()[index]));
    }
    columns.extend([
        Arc::new(
            rows.iter()
                .map(|r| r.first_case_date.map(date32))
                .collect::<Date32Array>(),
        ) as ArrayRef,
        opt_ints(&|r| r.days_since_first_case),
        floats(&|r| r.positive_per_100k),
        floats(&|r| r.death_per_100k),
        opt_floats(&|r| r.decay_multiplier),
        opt_floats(&|r| r.adjusted_positive_per_100k),
        opt_floats(&|r| r.adjusted_death_per_100k),
    ]);

    Ok(RecordBatch::try_new(Arc::new(metrics_schema()), columns)?)
}

fn with_index_column(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = vec![Arc::new(Field::new(col::ROW, DataType::Int64, false))];
    fields.extend(schema.fields().iter().cloned());

    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(
        0..batch.num_rows() as i64,
    ))];
    columns.extend(batch.columns().iter().cloned());

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

fn date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
