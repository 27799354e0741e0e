//! Registers a computed metrics table in DataFusion and queries it with SQL.
//!
//! Run with:
//! ```bash
//! cargo run --example sql_exploration
//! ```

use chrono::{Duration, NaiveDate};
use epi_rates::core::{compute, first_observations, CaseRecord, DemographicRecord, EpiContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).ok_or("invalid start date")?;

    // Two weeks of compounding growth in three states.
    let mut cases = Vec::new();
    for (state, seed, growth) in [("NJ", 2_i64, 1.45), ("LA", 1, 1.55), ("UT", 1, 1.25)] {
        for offset in 0..14 {
            let positive = (seed as f64 * growth_factor(growth, offset)).round() as i64;
            cases.push(
                CaseRecord::new(state, start + Duration::days(offset))
                    .with_positive(Some(positive))
                    .with_death(Some(positive / 80)),
            );
        }
    }
    let demographics = vec![
        DemographicRecord::new("34", Some(8_882_190)),
        DemographicRecord::new("22", Some(4_648_794)),
        DemographicRecord::new("49", Some(3_205_958)),
    ];

    let table = compute(&cases, &demographics, &first_observations(&cases))?;

    let mut ctx = EpiContext::new()?;
    ctx.register_metrics("metrics", &table.rows)?;

    println!("Peak adjusted positive rate per state:");
    ctx.inner()
        .sql(
            "SELECT state, max(adjusted_positive_per_100k) AS peak_adjusted, \
                    max(positive_per_100k) AS peak_raw \
             FROM metrics GROUP BY state ORDER BY peak_adjusted DESC",
        )
        .await?
        .show()
        .await?;

    println!("Last week, Louisiana:");
    ctx.inner()
        .sql(
            "SELECT date, positive, days_since_first_case, decay_multiplier, \
                    adjusted_positive_per_100k \
             FROM metrics WHERE state = 'LA' AND days_since_first_case >= 7 ORDER BY date",
        )
        .await?
        .show()
        .await?;

    Ok(())
}

fn growth_factor(growth: f64, days: i64) -> f64 {
    growth.powi(days as i32)
}
