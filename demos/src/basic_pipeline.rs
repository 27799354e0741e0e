//! Basic pipeline example demonstrating epi-rates' core functionality.
//!
//! This example shows how to:
//! - Load a case series and census estimates from CSV files
//! - Run the pipeline and write the metrics table
//! - Inspect rejected rows and states without a baseline
//!
//! Run with:
//! ```bash
//! cargo run --example basic_pipeline
//! ```

use epi_rates::formatters::{FormatterConfig, HumanFormatter, SummaryFormatter};
use epi_rates::pipeline::Pipeline;
use epi_rates::sources::{CsvCaseSource, CsvDemographicSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let cases = r#"date,state,positive,negative,pending,hospitalized,death,total
20200306,WA,70,1000,,,10,1070
20200307,WA,102,1100,,,13,1202
20200308,WA,118,1170,,,17,1288
20200310,WY,10,90,,,,100
20200315,WY,50,300,2,,1,352
20200311,VT,,,,,,
20200312,VT,3,20,,,,23
20200312,ZZ,1,1,,,,2"#;

    let census = r#"state,name,population,median_age_male,median_age_female,uninsured
53,Washington,7294336,36.8,38.5,449000
56,Wyoming,578759,37.9,38.6,61000
50,Vermont,624313,41.2,44.0,28000"#;

    let dir = tempfile::tempdir()?;
    let cases_path = dir.path().join("states_daily.csv");
    let census_path = dir.path().join("census.csv");
    std::fs::write(&cases_path, cases)?;
    std::fs::write(&census_path, census)?;

    let pipeline = Pipeline::new(
        CsvCaseSource::new(cases_path.to_string_lossy())?,
        CsvDemographicSource::new(census_path.to_string_lossy()),
    );

    let destination = dir.path().join("out").join("metrics.csv");
    let summary = pipeline.run(&destination).await?;

    let formatter = HumanFormatter::with_config(FormatterConfig::default().with_colors(false));
    println!("{}", formatter.format(&summary)?);

    println!("First rows of {}:", destination.display());
    for line in std::fs::read_to_string(&destination)?.lines().take(4) {
        println!("  {line}");
    }

    Ok(())
}
