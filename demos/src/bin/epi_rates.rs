//! Command line driver for the epi-rates pipeline.
//!
//! ```bash
//! epi-rates --cases 'data/cases/*.csv' --demographics data/census.csv \
//!     --output out/metrics.csv --format markdown
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use epi_rates::config::PipelineConfig;
use epi_rates::core::RejectPolicy;
use epi_rates::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, SummaryFormatter,
};
use epi_rates::logging::setup::{init_logging, LoggingConfig};
use epi_rates::pipeline::Pipeline;
use epi_rates::sources::{CsvCaseSource, CsvDemographicSource};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Human,
    Json,
    Markdown,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Case series CSV path or glob pattern
    #[arg(long)]
    cases: Option<String>,

    /// Demographics CSV path
    #[arg(long)]
    demographics: Option<String>,

    /// Output CSV path
    #[arg(long, short)]
    output: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Abort on the first rejected row
    #[arg(long)]
    strict: bool,

    /// Summary format
    #[arg(long, value_enum, default_value = "human")]
    format: Format,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Pull inputs from the public APIs instead of CSV files
    #[cfg(feature = "remote")]
    #[arg(long, requires = "census_key")]
    remote: bool,

    /// File holding the Census API key
    #[cfg(feature = "remote")]
    #[arg(long)]
    census_key: Option<PathBuf>,

    /// Cache file for the case series pull
    #[cfg(feature = "remote")]
    #[arg(long, default_value = "data/states_daily.json")]
    cache: PathBuf,

    /// Re-fetch the case series even when cached
    #[cfg(feature = "remote")]
    #[arg(long)]
    refresh: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if self.strict {
            config = config.with_reject_policy(RejectPolicy::FailFast);
        }
        Ok(config)
    }

    fn csv_pipeline(&self, config: &PipelineConfig) -> Result<Pipeline> {
        let cases = self
            .cases
            .as_deref()
            .context("--cases is required for CSV input")?;
        let demographics = self
            .demographics
            .as_deref()
            .context("--demographics is required for CSV input")?;

        let case_source = if cases.contains(['*', '?', '[']) {
            CsvCaseSource::from_glob(cases)?
        } else {
            CsvCaseSource::new(cases)?
        };
        Ok(Pipeline::new(
            case_source.with_context_config(config.context.clone()),
            CsvDemographicSource::new(demographics).with_context_config(config.context.clone()),
        ))
    }

    #[cfg(feature = "remote")]
    fn pipeline(&self, config: &PipelineConfig) -> Result<Pipeline> {
        use epi_rates::sources::{CensusSource, CovidTrackingSource};

        if !self.remote {
            return self.csv_pipeline(config);
        }
        let key = self
            .census_key
            .clone()
            .context("--census-key is required with --remote")?;
        Ok(Pipeline::new(
            CovidTrackingSource::new(&self.cache).with_refresh(self.refresh),
            CensusSource::new(key),
        ))
    }

    #[cfg(not(feature = "remote"))]
    fn pipeline(&self, config: &PipelineConfig) -> Result<Pipeline> {
        self.csv_pipeline(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig::default()
        .with_crate_level(tracing::Level::INFO)
        .with_json_format(args.json_logs);
    init_logging(logging).map_err(|e| anyhow::anyhow!("{e}"))?;

    let config = args.pipeline_config()?;
    let pipeline = args.pipeline(&config)?.with_config(config);

    let summary = match pipeline.run(&args.output).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("epi-rates: {err}");
            process::exit(1);
        }
    };

    let formatter_config = FormatterConfig::default().with_max_rejections(Some(20));
    let rendered = match args.format {
        Format::Human => HumanFormatter::with_config(formatter_config).format(&summary)?,
        Format::Json => JsonFormatter::with_config(formatter_config).format(&summary)?,
        Format::Markdown => MarkdownFormatter::with_config(formatter_config).format(&summary)?,
    };
    println!("{rendered}");

    if !summary.is_clean() {
        process::exit(2);
    }
    Ok(())
}
