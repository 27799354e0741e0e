//! Loaders for the two pipeline inputs.
//!
//! A [`CaseSource`] yields the daily case series and a [`DemographicSource`]
//! yields one census record per state. Local CSV implementations are always
//! available; the remote API loaders live behind the `remote` feature.
//!
//! Loader failures are opaque to the pipeline: a failed load aborts the run.

use crate::core::records::{CaseRecord, DemographicRecord};
use crate::prelude::*;
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;

mod csv;

#[cfg(feature = "remote")]
mod census;
#[cfg(feature = "remote")]
mod covid_tracking;

pub use csv::{CsvCaseSource, CsvDemographicSource};

#[cfg(feature = "remote")]
pub use census::{CensusSource, CENSUS_VARIABLES};
#[cfg(feature = "remote")]
pub use covid_tracking::CovidTrackingSource;

/// Produces the daily per-state case series.
#[async_trait]
pub trait CaseSource: Debug + Send + Sync {
    /// Loads every case record.
    async fn load(&self) -> Result<Vec<CaseRecord>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Produces one demographic record per state.
#[async_trait]
pub trait DemographicSource: Debug + Send + Sync {
    /// Loads every demographic record.
    async fn load(&self) -> Result<Vec<DemographicRecord>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Parses a case-series date in `YYYYMMDD` or `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|e| EpiError::Parse(format!("Invalid date '{trimmed}': {e}")))
}

/// Expands glob patterns into file paths.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    use glob::glob;

    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob(pattern).map_err(|e| {
            EpiError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry.map_err(|e| EpiError::Io(std::io::Error::other(e)))?;

            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(EpiError::data_source(
            "file",
            "No files found matching glob patterns",
        ));
    }

    paths.sort();
    Ok(paths)
}

/// Typed, cast views over the columns of one record batch.
pub(crate) struct BatchColumns<'a> {
    batch: &'a RecordBatch,
}

impl<'a> BatchColumns<'a> {
    pub(crate) fn new(batch: &'a RecordBatch) -> Self {
        Self { batch }
    }

    fn column(&self, name: &str) -> Result<&'a ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| EpiError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    pub(crate) fn strings(&self, name: &str) -> Result<StringArray> {
        let array = cast(self.column(name)?, &DataType::Utf8)?;
        downcast::<StringArray>(&array, name)
    }

    /// Count column as integers. Values may be written as `10` or `10.0`;
    /// a fractional or non-finite value is a parse error.
    pub(crate) fn whole_numbers(&self, name: &str) -> Result<Int64Array> {
        let array = cast(self.column(name)?, &DataType::Float64)?;
        let floats = downcast::<Float64Array>(&array, name)?;
        floats
            .iter()
            .map(|value| value.map(|v| whole_number(v, name)).transpose())
            .collect::<Result<Int64Array>>()
    }

    pub(crate) fn optional_whole_numbers(&self, name: &str) -> Result<Option<Int64Array>> {
        if self.batch.column_by_name(name).is_none() {
            return Ok(None);
        }
        self.whole_numbers(name).map(Some)
    }

    pub(crate) fn optional_floats(&self, name: &str) -> Result<Option<Float64Array>> {
        let Some(column) = self.batch.column_by_name(name) else {
            return Ok(None);
        };
        let array = cast(column, &DataType::Float64)?;
        downcast::<Float64Array>(&array, name).map(Some)
    }
}

fn downcast<T: Array + Clone + 'static>(array: &ArrayRef, name: &str) -> Result<T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| EpiError::Internal(format!("Column '{name}' did not cast as expected")))
}

fn whole_number(value: f64, column: &str) -> Result<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(EpiError::Parse(format!(
            "Column '{column}' value {value} is not a whole number"
        )))
    }
}

/// Value at `index`, or `None` when null.
pub(crate) fn value_at<T: arrow::datatypes::ArrowPrimitiveType>(
    array: &arrow::array::PrimitiveArray<T>,
    index: usize,
) -> Option<T::Native> {
    if array.is_null(index) {
        None
    } else {
        Some(array.value(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 10).unwrap();
        assert_eq!(parse_date("20200310").unwrap(), expected);
        assert_eq!(parse_date("2020-03-10").unwrap(), expected);
        assert_eq!(parse_date(" 2020-03-10 ").unwrap(), expected);
        assert!(matches!(parse_date("03/10/2020"), Err(EpiError::Parse(_))));
    }

    #[test]
    fn test_batch_columns_cast_and_missing() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("state", DataType::Utf8, false),
            Field::new("positive", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["WY", "VT"])),
                Arc::new(arrow::array::Int32Array::from(vec![Some(3), None])),
            ],
        )
        .unwrap();

        let columns = BatchColumns::new(&batch);
        let positive = columns.whole_numbers("positive").unwrap();
        assert_eq!(value_at(&positive, 0), Some(3));
        assert_eq!(value_at(&positive, 1), None);
        assert_eq!(columns.strings("state").unwrap().value(1), "VT");
        assert!(columns.optional_whole_numbers("death").unwrap().is_none());
        assert!(matches!(
            columns.strings("date"),
            Err(EpiError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_whole_numbers_accept_integral_floats_only() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("population", DataType::Float64, true),
            Field::new("death", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(578_759.0), None])),
                Arc::new(Float64Array::from(vec![Some(2.0), Some(10.5)])),
            ],
        )
        .unwrap();

        let columns = BatchColumns::new(&batch);
        let population = columns.whole_numbers("population").unwrap();
        assert_eq!(value_at(&population, 0), Some(578_759));
        assert_eq!(value_at(&population, 1), None);
        assert!(matches!(
            columns.whole_numbers("death"),
            Err(EpiError::Parse(ref message)) if message.contains("10.5")
        ));
    }

    #[test]
    fn test_whole_number_rejects_non_finite() {
        assert_eq!(whole_number(-3.0, "death").unwrap(), -3);
        assert!(whole_number(f64::NAN, "death").is_err());
        assert!(whole_number(f64::INFINITY, "death").is_err());
    }

    #[test]
    fn test_expand_globs_without_matches() {
        let dir = tempfile::TempDir::new().unwrap();
        let pattern = format!("{}/*.csv", dir.path().display());
        assert!(expand_globs(&[pattern]).is_err());
    }
}
