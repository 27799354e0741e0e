//! Example demonstrating the run summary formatters.
//!
//! This example shows how to format a run summary in different ways:
//! - JSON format for programmatic consumption
//! - Human-readable format for console output
//! - Markdown format for documentation
//! - Custom formatting configurations

use chrono::NaiveDate;
use epi_rates::core::{CaseRecord, DemographicRecord};
use epi_rates::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, SummaryFormatter,
};
use epi_rates::pipeline::Pipeline;
use epi_rates::prelude::*;
use std::error::Error;

#[derive(Debug)]
struct InMemoryCases(Vec<CaseRecord>);

#[async_trait::async_trait]
impl CaseSource for InMemoryCases {
    async fn load(&self) -> Result<Vec<CaseRecord>> {
        Ok(self.0.clone())
    }

    fn description(&self) -> String {
        format!("{} in-memory case records", self.0.len())
    }
}

#[derive(Debug)]
struct InMemoryDemographics(Vec<DemographicRecord>);

#[async_trait::async_trait]
impl DemographicSource for InMemoryDemographics {
    async fn load(&self) -> Result<Vec<DemographicRecord>> {
        Ok(self.0.clone())
    }

    fn description(&self) -> String {
        format!("{} in-memory demographic records", self.0.len())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    let day = |d| NaiveDate::from_ymd_opt(2020, 3, d).expect("valid date");

    // Unknown codes, a zero population and a state missing from the census
    // all show up in the summary.
    let cases = InMemoryCases(vec![
        CaseRecord::new("NY", day(2)).with_positive(Some(1)),
        CaseRecord::new("NY", day(9)).with_positive(Some(142)).with_death(Some(0)),
        CaseRecord::new("NY", day(16)).with_positive(Some(950)).with_death(Some(7)),
        CaseRecord::new("AK", day(16)).with_positive(Some(1)),
        CaseRecord::new("XX", day(16)).with_positive(Some(3)),
        CaseRecord::new("YY", day(16)).with_positive(Some(4)),
        CaseRecord::new("OR", day(16)).with_positive(Some(47)),
    ]);
    let demographics = InMemoryDemographics(vec![
        DemographicRecord::new("36", Some(19_618_453)),
        DemographicRecord::new("02", Some(0)),
    ]);

    let dir = tempfile::tempdir()?;
    let summary = Pipeline::new(cases, demographics)
        .run(dir.path().join("metrics.csv"))
        .await?;

    println!("=== JSON (compact, first rejection only) ===");
    let json = JsonFormatter::with_config(FormatterConfig::ci().with_max_rejections(Some(1)))
        .with_pretty(false);
    println!("{}", json.format(&summary)?);

    println!("\n=== Human ===");
    println!("{}", HumanFormatter::new().format(&summary)?);

    println!("=== Markdown ===");
    println!(
        "{}",
        MarkdownFormatter::new().with_heading_level(3).format(&summary)?
    );

    println!("=== Minimal ===");
    println!(
        "{}",
        HumanFormatter::with_config(FormatterConfig::minimal()).format(&summary)?
    );

    Ok(())
}
