//! Pulls the case series and census estimates from their public APIs.
//!
//! Needs a Census API key in a file (first non-empty line):
//! ```bash
//! echo "$CENSUS_API_KEY" > census.key
//! cargo run --example remote_pipeline --features remote -- census.key
//! ```
//!
//! The case series is cached under `data/`; delete the cache or set
//! `EPI_REFRESH=1` to re-fetch.

use epi_rates::formatters::{HumanFormatter, SummaryFormatter};
use epi_rates::logging::setup::{init_logging, LoggingConfig};
use epi_rates::pipeline::Pipeline;
use epi_rates::sources::{CensusSource, CovidTrackingSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let key_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "census.key".to_string());
    let refresh = std::env::var("EPI_REFRESH").is_ok_and(|v| v == "1");

    let pipeline = Pipeline::new(
        CovidTrackingSource::new("data/states_daily.json").with_refresh(refresh),
        CensusSource::new(key_path),
    );
    let summary = pipeline.run("data/metrics.csv").await?;

    println!("{}", HumanFormatter::new().format(&summary)?);
    Ok(())
}
