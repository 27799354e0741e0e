//! # epi-rates - State Epidemic Rates for Rust
//!
//! epi-rates joins daily per-state epidemic case counts with census
//! demographics and derives population-normalized, time-adjusted rates.
//!
//! ## Overview
//!
//! A run loads two inputs, the case series and one demographic record per
//! state, reconciles their state codes (postal abbreviations on one side, FIPS
//! codes on the other), and computes for every (state, date):
//!
//! - positive and death counts per 100,000 residents
//! - days since the state's first reported positive count
//! - a decay multiplier `elapsed / (1 + elapsed)`
//! - the rates scaled by that multiplier
//!
//! The result is written as a single CSV table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use epi_rates::prelude::*;
//! use epi_rates::pipeline::Pipeline;
//! use epi_rates::sources::{CsvCaseSource, CsvDemographicSource};
//!
//! # async fn example() -> Result<()> {
//! let summary = Pipeline::new(
//!     CsvCaseSource::from_glob("data/cases/*.csv")?,
//!     CsvDemographicSource::new("data/census.csv"),
//! )
//! .run("out/metrics.csv")
//! .await?;
//!
//! println!("{}", epi_rates::formatters::HumanFormatter::new().format(&summary)?);
//! # Ok(())
//! # }
//! ```
//!
//! The core computation is available without any I/O:
//!
//! ```rust
//! use chrono::NaiveDate;
//! use epi_rates::core::{compute, first_observations, CaseRecord, DemographicRecord};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap();
//! let cases = vec![
//!     CaseRecord::new("WY", day(10)).with_positive(Some(10)),
//!     CaseRecord::new("WY", day(15)).with_positive(Some(50)),
//! ];
//! let demographics = vec![DemographicRecord::new("56", Some(500_000))];
//!
//! let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();
//! assert_eq!(table.rows[1].days_since_first_case, Some(5));
//! assert_eq!(table.rows[1].positive_per_100k, 10.0);
//! ```
//!
//! ## Data Sources
//!
//! - [`sources::CsvCaseSource`] and [`sources::CsvDemographicSource`] read
//!   local files through DataFusion.
//! - With the `remote` feature, [`sources::CovidTrackingSource`] pulls the
//!   states daily series (cached on disk) and [`sources::CensusSource`] pulls
//!   ACS estimates using an API key file.
//!
//! ## Failure Handling
//!
//! Case rows whose state code is unknown, or whose state has no usable
//! population, are collected as rejections, or abort the run under
//! [`core::RejectPolicy::FailFast`]. Case states missing from the
//! demographics are reported, never silently dropped. Any loader failure
//! aborts the run before output is written.

pub mod columns;
pub mod config;
pub mod core;
pub mod credentials;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod sink;
pub mod sources;
