//! Integration tests for data sources.

use chrono::NaiveDate;
use epi_rates::prelude::*;
use epi_rates::sources::{CsvCaseSource, CsvDemographicSource};
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

/// Creates a test directory with two daily case files and a demographics file.
fn create_csv_test_data() -> TempDir {
    let dir = TempDir::new().unwrap();

    let mut march = File::create(dir.path().join("cases_202003.csv")).unwrap();
    writeln!(march, "date,state,positive,negative,pending,hospitalized,death,total").unwrap();
    writeln!(march, "20200310,WY,10,90,,,,100").unwrap();
    writeln!(march, "20200315,WY,50,300,2,,1,352").unwrap();
    writeln!(march, "20200315,VT,,,,,,").unwrap();
    march.flush().unwrap();

    let mut april = File::create(dir.path().join("cases_202004.csv")).unwrap();
    writeln!(april, "date,state,positive,negative,pending,hospitalized,death,total").unwrap();
    writeln!(april, "2020-04-01,wy,120,800,,4,2,920").unwrap();
    april.flush().unwrap();

    let mut census = File::create(dir.path().join("census.csv")).unwrap();
    writeln!(census, "state,name,population,median_age_male,uninsured").unwrap();
    writeln!(census, "56,Wyoming,500000,37.9,61000").unwrap();
    writeln!(census, "50,Vermont,623989,,").unwrap();
    census.flush().unwrap();

    dir
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_csv_case_source_reads_empty_fields_as_unreported() {
    let dir = create_csv_test_data();
    let path = dir.path().join("cases_202003.csv");
    let source = CsvCaseSource::new(path.to_str().unwrap()).unwrap();

    let mut cases = source.load().await.unwrap();
    cases.sort_by(|a, b| (a.date, &a.state).cmp(&(b.date, &b.state)));
    assert_eq!(cases.len(), 3);

    let wy_first = &cases[0];
    assert_eq!(wy_first.state, "WY");
    assert_eq!(wy_first.date, day(2020, 3, 10));
    assert_eq!(wy_first.positive, Some(10));
    assert_eq!(wy_first.pending, None);
    assert_eq!(wy_first.total, Some(100));

    let vermont = cases.iter().find(|c| c.state == "VT").unwrap();
    assert_eq!(vermont.positive, None);
    assert_eq!(vermont.death, None);
}

#[tokio::test]
async fn test_csv_case_source_glob_spans_files_and_date_formats() {
    let dir = create_csv_test_data();
    let pattern = dir.path().join("cases_*.csv");
    let source = CsvCaseSource::from_glob(pattern.to_str().unwrap()).unwrap();
    assert!(source.description().contains("2 files"));

    let cases = source.load().await.unwrap();
    assert_eq!(cases.len(), 4);
    let april = cases
        .iter()
        .find(|c| c.date == day(2020, 4, 1))
        .expect("april row");
    assert_eq!(april.state, "wy");
    assert_eq!(april.hospitalized, Some(4));
}

#[tokio::test]
async fn test_csv_case_source_requires_state_column() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "date,positive\n20200310,1\n").unwrap();

    let source = CsvCaseSource::new(path.to_str().unwrap()).unwrap();
    let err = source.load().await.unwrap_err();
    assert!(matches!(err, EpiError::ColumnNotFound { ref column } if column == "state"));
}

#[test]
fn test_csv_case_source_rejects_empty_glob() {
    let dir = TempDir::new().unwrap();
    let pattern = dir.path().join("*.csv");
    assert!(CsvCaseSource::from_glob(pattern.to_str().unwrap()).is_err());
}

#[tokio::test]
async fn test_csv_demographic_source_keeps_fips_codes_and_nulls() {
    let dir = create_csv_test_data();
    let path = dir.path().join("census.csv");
    let source = CsvDemographicSource::new(path.to_str().unwrap());

    let demographics = source.load().await.unwrap();
    assert_eq!(demographics.len(), 2);

    let wyoming = demographics.iter().find(|d| d.state == "56").unwrap();
    assert_eq!(wyoming.name.as_deref(), Some("Wyoming"));
    assert_eq!(wyoming.population, Some(500_000));
    assert_eq!(wyoming.median_age_male, Some(37.9));
    assert_eq!(wyoming.median_age_female, None);
    assert_eq!(wyoming.uninsured, Some(61_000));
    assert_eq!(wyoming.white, None);

    let vermont = demographics.iter().find(|d| d.state == "50").unwrap();
    assert_eq!(vermont.median_age_male, None);
}

#[tokio::test]
async fn test_tab_delimited_demographics() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("census.tsv");
    std::fs::write(&path, "state\tpopulation\n06\t39512223\n").unwrap();

    let source = CsvDemographicSource::new(path.to_str().unwrap()).with_delimiter(b'\t');
    let demographics = source.load().await.unwrap();
    assert_eq!(demographics[0].state, "06");
    assert_eq!(demographics[0].population, Some(39_512_223));
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let source = CsvDemographicSource::new("/nonexistent/census.csv");
    assert!(source.load().await.is_err());
}
