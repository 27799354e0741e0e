//! Prelude for commonly used types and traits in epi-rates.

pub use crate::core::{
    CaseRecord, DemographicRecord, EpiContext, EpiContextConfig, MetricRow, MetricsTable,
    RejectPolicy, StateKey,
};
pub use crate::error::{EpiError, ErrorContext, Result};
pub use crate::formatters::{FormatterConfig, SummaryFormatter};
pub use crate::logging::LogConfig;
pub use crate::sink::{CsvSink, ResultSink};
pub use crate::sources::{CaseSource, DemographicSource};
