//! One end-to-end run: load, derive baselines, compute, write.
//!
//! Both loaders are awaited concurrently. A loader failure aborts the run
//! before anything is written.
//!
//! # Examples
//!
//! ```rust,no_run
//! use epi_rates::pipeline::Pipeline;
//! use epi_rates::sources::{CsvCaseSource, CsvDemographicSource};
//!
//! # async fn example() -> epi_rates::prelude::Result<()> {
//! let pipeline = Pipeline::new(
//!     CsvCaseSource::new("data/states_daily.csv")?,
//!     CsvDemographicSource::new("data/census.csv"),
//! );
//! let summary = pipeline.run("out/metrics.csv").await?;
//! println!("{} rows, sha256 {}", summary.output_rows, summary.output.sha256);
//! # Ok(())
//! # }
//! ```

use crate::config::PipelineConfig;
use crate::core::baseline::first_observations;
use crate::core::metrics::{compute_with_policy, MetricsTable, RowRejection};
use crate::prelude::*;
use crate::sink::{CsvSink, SinkReceipt};
use crate::{log_data_op, log_row_detail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// A rejected row as reported in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub code: String,
    pub date: NaiveDate,
    pub reason: String,
}

impl From<&RowRejection> for RejectedRow {
    fn from(rejection: &RowRejection) -> Self {
        Self {
            code: rejection.code.clone(),
            date: rejection.date,
            reason: rejection.reason.to_string(),
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub case_records: usize,
    pub demographic_records: usize,
    /// States with a first observation
    pub baselines: usize,
    pub output_rows: usize,
    pub rejected_unknown_state: usize,
    pub rejected_invalid_population: usize,
    /// Rejected rows in input order
    pub rejections: Vec<RejectedRow>,
    /// Postal abbreviations of case states absent from demographics
    pub unmatched_states: Vec<String>,
    /// Postal abbreviations of joined states with no baseline
    pub states_without_baseline: Vec<String>,
    pub output: SinkReceipt,
}

impl RunSummary {
    pub fn rejected_rows(&self) -> usize {
        self.rejected_unknown_state + self.rejected_invalid_population
    }

    /// True when every case row made it into the output.
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty() && self.unmatched_states.is_empty()
    }
}

/// The metrics table together with the input sizes that produced it.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: MetricsTable,
    pub case_records: usize,
    pub demographic_records: usize,
    pub baselines: usize,
}

/// Wires the two loaders, the metrics computation and a sink.
#[derive(Clone)]
pub struct Pipeline {
    cases: Arc<dyn CaseSource>,
    demographics: Arc<dyn DemographicSource>,
    sink: Option<Arc<dyn ResultSink>>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cases", &self.cases.description())
            .field("demographics", &self.demographics.description())
            .field("custom_sink", &self.sink.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline writing through a [`CsvSink`] built from the
    /// configured sink options.
    pub fn new(
        cases: impl CaseSource + 'static,
        demographics: impl DemographicSource + 'static,
    ) -> Self {
        Self {
            cases: Arc::new(cases),
            demographics: Arc::new(demographics),
            sink: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default CSV sink.
    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads both inputs and computes the metrics table without writing it.
    #[instrument(skip(self), fields(policy = ?self.config.reject_policy))]
    pub async fn compute(&self) -> Result<PipelineOutput> {
        self.config.validate()?;
        let log = self.config.log_config();

        log_data_op!(
            log,
            cases = %self.cases.description(),
            demographics = %self.demographics.description(),
            "Loading inputs"
        );
        let (cases, demographics) =
            tokio::try_join!(self.cases.load(), self.demographics.load())?;
        log_data_op!(
            log,
            case_records = cases.len(),
            demographic_records = demographics.len(),
            "Loaded inputs"
        );

        let baselines = first_observations(&cases);
        let table = compute_with_policy(
            &cases,
            &demographics,
            &baselines,
            self.config.reject_policy,
        )?;

        for rejection in &table.rejections {
            log_row_detail!(
                log,
                code = %crate::logging::truncate_field(&rejection.code, log.max_field_length),
                date = %rejection.date,
                reason = %rejection.reason,
                "Rejected row"
            );
        }

        Ok(PipelineOutput {
            case_records: cases.len(),
            demographic_records: demographics.len(),
            baselines: baselines.len(),
            table,
        })
    }

    /// Runs the pipeline and writes the table to `destination`.
    #[instrument(skip(self, destination), fields(destination = %destination.as_ref().display()))]
    pub async fn run(&self, destination: impl AsRef<Path>) -> Result<RunSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let output = self.compute().await?;
        let receipt = match &self.sink {
            Some(sink) => sink.write(&output.table.rows, destination.as_ref()).await?,
            None => {
                CsvSink::with_options(self.config.sink.clone())
                    .write(&output.table.rows, destination.as_ref())
                    .await?
            }
        };

        let table = &output.table;
        let summary = RunSummary {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            case_records: output.case_records,
            demographic_records: output.demographic_records,
            baselines: output.baselines,
            output_rows: table.rows.len(),
            rejected_unknown_state: table.unknown_state_count(),
            rejected_invalid_population: table.invalid_population_count(),
            rejections: table.rejections.iter().map(RejectedRow::from).collect(),
            unmatched_states: abbreviations(&table.unmatched_states),
            states_without_baseline: abbreviations(&table.states_without_baseline),
            output: receipt,
        };

        if !summary.states_without_baseline.is_empty() {
            warn!(
                states = ?summary.states_without_baseline,
                "States without a first observation have null adjusted rates"
            );
        }
        info!(
            rows = summary.output_rows,
            rejected = summary.rejected_rows(),
            elapsed_ms = summary.elapsed_ms,
            "Pipeline run complete"
        );
        Ok(summary)
    }
}

fn abbreviations(states: &[StateKey]) -> Vec<String> {
    states.iter().map(|s| s.abbreviation().to_string()).collect()
}
