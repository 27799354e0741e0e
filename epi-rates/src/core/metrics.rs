//! The metrics pipeline: joins case series, demographics and baselines, and
//! derives population-normalized, decay-adjusted rates.
//!
//! Joins are explicit hash joins keyed on [`StateKey`]:
//!
//! - case ⋈ demographics is an inner join; demographics is the authoritative
//!   state universe, so case rows for other states are dropped and the
//!   dropped states are reported in [`MetricsTable::unmatched_states`].
//! - the result ⟕ first observations is a left join; a missing baseline
//!   yields null elapsed days and null adjusted rates, never zeros.
//!
//! Per-row failures (unresolvable codes, unusable population) become
//! [`RowRejection`]s or, under [`RejectPolicy::FailFast`], the returned error.

use super::baseline::FirstObservations;
use super::records::{CaseRecord, DemographicRecord, MetricRow};
use super::state::{self, StateKey};
use crate::error::{EpiError, InvalidPopulationError, Result, UnknownStateError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Rates are expressed per this many residents.
pub const RATE_SCALE: f64 = 100_000.0;

/// What to do with a case row that cannot become a [`MetricRow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Keep going and report every rejected row in the table.
    #[default]
    Collect,
    /// Abort on the first rejected row and return its error.
    FailFast,
}

/// Why a case row produced no output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error(transparent)]
    UnknownState(#[from] UnknownStateError),
    #[error(transparent)]
    InvalidPopulation(#[from] InvalidPopulationError),
}

impl From<RejectionReason> for EpiError {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::UnknownState(err) => EpiError::UnknownState(err),
            RejectionReason::InvalidPopulation(err) => EpiError::InvalidPopulation(err),
        }
    }
}

/// A case row that was surfaced instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// State code as it appeared in the case record
    pub code: String,
    pub date: NaiveDate,
    pub reason: RejectionReason,
}

/// Output of [`compute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    /// Rows ordered by state then date
    pub rows: Vec<MetricRow>,
    /// Rejected case rows in input order
    pub rejections: Vec<RowRejection>,
    /// Case states that resolved but have no demographic record
    pub unmatched_states: Vec<StateKey>,
    /// Joined states that have no first observation
    pub states_without_baseline: Vec<StateKey>,
}

impl MetricsTable {
    /// Number of rejections caused by unresolvable state codes.
    pub fn unknown_state_count(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r.reason, RejectionReason::UnknownState(_)))
            .count()
    }

    /// Number of rejections caused by unusable population estimates.
    pub fn invalid_population_count(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r.reason, RejectionReason::InvalidPopulation(_)))
            .count()
    }
}

/// `100000 * count / population`. The caller guarantees `population > 0`.
pub fn rate_per_100k(count: i64, population: i64) -> f64 {
    RATE_SCALE * count as f64 / population as f64
}

/// `elapsed / (1 + elapsed)`: zero on the baseline day, approaching one as
/// history accumulates.
pub fn decay_multiplier(elapsed_days: i64) -> f64 {
    let elapsed = elapsed_days as f64;
    elapsed / (1.0 + elapsed)
}

/// Whole days between the baseline and the observation.
///
/// `None` for rows dated before the baseline: no case had been reported yet,
/// so there is no elapsed time to measure.
pub fn elapsed_days(date: NaiveDate, first_case_date: NaiveDate) -> Option<i64> {
    let elapsed = (date - first_case_date).num_days();
    (elapsed >= 0).then_some(elapsed)
}

/// Runs the pipeline collecting rejections.
pub fn compute(
    cases: &[CaseRecord],
    demographics: &[DemographicRecord],
    first_observations: &FirstObservations,
) -> Result<MetricsTable> {
    compute_with_policy(
        cases,
        demographics,
        first_observations,
        RejectPolicy::Collect,
    )
}

/// Runs the pipeline with an explicit rejection policy.
///
/// An unresolvable code in the demographic input is always a hard error: the
/// join universe cannot be built around it.
#[instrument(
    skip_all,
    fields(cases = cases.len(), demographics = demographics.len(), policy = ?policy)
)]
pub fn compute_with_policy(
    cases: &[CaseRecord],
    demographics: &[DemographicRecord],
    first_observations: &FirstObservations,
    policy: RejectPolicy,
) -> Result<MetricsTable> {
    let universe = index_demographics(demographics)?;

    let mut table = MetricsTable::default();
    let mut unmatched = BTreeSet::new();
    let mut without_baseline = BTreeSet::new();

    for record in cases {
        let outcome = state::resolve(&record.state)
            .map_err(RejectionReason::from)
            .and_then(|key| match universe.get(&key) {
                Some(demographic) => {
                    let first = first_observations.get(&key).copied();
                    let row = derive_row(key, record, demographic, first)?;
                    if first.is_none() {
                        without_baseline.insert(key);
                    }
                    Ok(Some(row))
                }
                None => {
                    unmatched.insert(key);
                    Ok(None)
                }
            });

        match outcome {
            Ok(Some(row)) => table.rows.push(row),
            Ok(None) => {}
            Err(reason) => {
                if policy == RejectPolicy::FailFast {
                    return Err(reason.into());
                }
                debug!(state = %record.state, date = %record.date, "Rejected case row: {reason}");
                table.rejections.push(RowRejection {
                    code: record.state.clone(),
                    date: record.date,
                    reason,
                });
            }
        }
    }

    table
        .rows
        .sort_by(|a, b| (a.state, a.date).cmp(&(b.state, b.date)));

    if !unmatched.is_empty() {
        warn!(
            states = ?unmatched.iter().map(StateKey::abbreviation).collect::<Vec<_>>(),
            "Case states missing from demographics were dropped by the join"
        );
    }
    if !table.rejections.is_empty() {
        warn!(
            rejected = table.rejections.len(),
            unknown_state = table.unknown_state_count(),
            invalid_population = table.invalid_population_count(),
            "Some case rows were rejected"
        );
    }

    table.unmatched_states = unmatched.into_iter().collect();
    table.states_without_baseline = without_baseline.into_iter().collect();

    info!(
        rows = table.rows.len(),
        rejected = table.rejections.len(),
        "Computed metrics table"
    );
    Ok(table)
}

fn index_demographics(
    demographics: &[DemographicRecord],
) -> Result<HashMap<StateKey, &DemographicRecord>> {
    let mut universe = HashMap::with_capacity(demographics.len());
    for record in demographics {
        let key = state::resolve(&record.state)?;
        if universe.contains_key(&key) {
            warn!(state = %key, "Duplicate demographic record, keeping the first");
            continue;
        }
        universe.insert(key, record);
    }
    Ok(universe)
}

fn derive_row(
    key: StateKey,
    record: &CaseRecord,
    demographic: &DemographicRecord,
    first_case_date: Option<NaiveDate>,
) -> std::result::Result<MetricRow, RejectionReason> {
    let population = match demographic.population {
        Some(population) if population > 0 => population,
        other => {
            return Err(InvalidPopulationError {
                state: key.abbreviation().to_string(),
                population: other,
            }
            .into())
        }
    };

    let counts = record.coalesced();
    let positive_per_100k = rate_per_100k(counts.positive, population);
    let death_per_100k = rate_per_100k(counts.death, population);

    let days_since_first_case =
        first_case_date.and_then(|first| elapsed_days(record.date, first));
    let decay = days_since_first_case.map(decay_multiplier);

    Ok(MetricRow {
        state: key,
        date: record.date,
        counts,
        demographics: demographic.clone(),
        first_case_date,
        days_since_first_case,
        positive_per_100k,
        death_per_100k,
        decay_multiplier: decay,
        adjusted_positive_per_100k: decay.map(|m| positive_per_100k * m),
        adjusted_death_per_100k: decay.map(|m| death_per_100k * m),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::baseline::first_observations;
    use crate::core::state::resolve;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn wyoming() -> Vec<DemographicRecord> {
        vec![DemographicRecord::new("56", Some(500_000))]
    }

    #[test]
    fn test_wyoming_scenario() {
        let cases = vec![
            CaseRecord::new("WY", day(15)).with_positive(Some(50)),
            CaseRecord::new("WY", day(10)).with_positive(Some(10)),
        ];
        let baselines = first_observations(&cases);

        let table = compute(&cases, &wyoming(), &baselines).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.rejections.is_empty());

        let first = &table.rows[0];
        assert_eq!(first.date, day(10));
        assert_eq!(first.days_since_first_case, Some(0));
        assert_eq!(first.positive_per_100k, 2.0);
        assert_eq!(first.decay_multiplier, Some(0.0));
        assert_eq!(first.adjusted_positive_per_100k, Some(0.0));

        let later = &table.rows[1];
        assert_eq!(later.days_since_first_case, Some(5));
        assert_eq!(later.positive_per_100k, 10.0);
        let multiplier = later.decay_multiplier.unwrap();
        assert!((multiplier - 5.0 / 6.0).abs() < 1e-12);
        assert!((later.adjusted_positive_per_100k.unwrap() - 8.333_333).abs() < 1e-3);
    }

    #[test]
    fn test_inner_join_drops_states_without_demographics() {
        let cases = vec![
            CaseRecord::new("WY", day(10)).with_positive(Some(1)),
            CaseRecord::new("NY", day(10)).with_positive(Some(1)),
        ];
        let baselines = first_observations(&cases);

        let table = compute(&cases, &wyoming(), &baselines).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].state.abbreviation(), "WY");
        assert_eq!(table.unmatched_states, vec![resolve("NY").unwrap()]);
        assert!(table.rejections.is_empty());
    }

    #[test]
    fn test_missing_baseline_propagates_nulls() {
        let cases = vec![CaseRecord::new("WY", day(10)).with_death(Some(5))];
        let table = compute(&cases, &wyoming(), &FirstObservations::new()).unwrap();

        let row = &table.rows[0];
        assert_eq!(row.first_case_date, None);
        assert_eq!(row.days_since_first_case, None);
        assert_eq!(row.decay_multiplier, None);
        assert_eq!(row.adjusted_positive_per_100k, None);
        assert_eq!(row.adjusted_death_per_100k, None);
        assert_eq!(row.positive_per_100k, 0.0);
        assert_eq!(row.death_per_100k, 1.0);
        assert_eq!(table.states_without_baseline, vec![resolve("WY").unwrap()]);
    }

    #[test]
    fn test_unknown_case_code_is_rejected() {
        let cases = vec![
            CaseRecord::new("ZZ", day(10)).with_positive(Some(1)),
            CaseRecord::new("WY", day(10)).with_positive(Some(1)),
        ];
        let baselines = first_observations(&cases);

        let table = compute(&cases, &wyoming(), &baselines).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.unknown_state_count(), 1);
        assert_eq!(table.rejections[0].code, "ZZ");
        assert_eq!(
            table.rejections[0].reason,
            RejectionReason::UnknownState(UnknownStateError::new("ZZ"))
        );
    }

    #[test]
    fn test_fail_fast_returns_first_rejection() {
        let cases = vec![CaseRecord::new("ZZ", day(10)).with_positive(Some(1))];
        let err = compute_with_policy(
            &cases,
            &wyoming(),
            &FirstObservations::new(),
            RejectPolicy::FailFast,
        )
        .unwrap_err();
        assert!(matches!(err, EpiError::UnknownState(ref e) if e.code == "ZZ"));
    }

    #[test]
    fn test_zero_population_rejects_every_row_of_the_state() {
        let demographics = vec![
            DemographicRecord::new("56", Some(0)),
            DemographicRecord::new("50", Some(640_000)),
        ];
        let cases = vec![
            CaseRecord::new("WY", day(10)).with_positive(Some(1)),
            CaseRecord::new("WY", day(11)).with_positive(Some(2)),
            CaseRecord::new("VT", day(10)).with_positive(Some(1)),
        ];
        let baselines = first_observations(&cases);

        let table = compute(&cases, &demographics, &baselines).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].state.abbreviation(), "VT");
        assert_eq!(table.invalid_population_count(), 2);
        for rejection in &table.rejections {
            assert_eq!(
                rejection.reason,
                RejectionReason::InvalidPopulation(InvalidPopulationError {
                    state: "WY".to_string(),
                    population: Some(0),
                })
            );
        }
    }

    #[test]
    fn test_rejected_states_are_not_listed_without_baseline() {
        let demographics = vec![
            DemographicRecord::new("56", Some(0)),
            DemographicRecord::new("50", Some(640_000)),
        ];
        // Neither state has a reported positive, so neither has a baseline.
        let cases = vec![
            CaseRecord::new("WY", day(10)).with_death(Some(1)),
            CaseRecord::new("VT", day(10)).with_death(Some(1)),
        ];

        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();
        assert_eq!(table.invalid_population_count(), 1);
        assert_eq!(table.states_without_baseline, vec![resolve("VT").unwrap()]);
    }

    #[test]
    fn test_missing_and_negative_population_are_invalid() {
        let cases = vec![
            CaseRecord::new("WY", day(10)).with_positive(Some(1)),
            CaseRecord::new("VT", day(10)).with_positive(Some(1)),
        ];
        let demographics = vec![
            DemographicRecord::new("56", None),
            DemographicRecord::new("50", Some(-5)),
        ];

        let table = compute(&cases, &demographics, &FirstObservations::new()).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.invalid_population_count(), 2);
    }

    #[test]
    fn test_unknown_demographic_code_is_an_error() {
        let demographics = vec![DemographicRecord::new("99", Some(1_000))];
        let err = compute(&[], &demographics, &FirstObservations::new()).unwrap_err();
        assert!(matches!(err, EpiError::UnknownState(_)));
    }

    #[test]
    fn test_duplicate_demographics_keep_first() {
        let demographics = vec![
            DemographicRecord::new("56", Some(500_000)),
            DemographicRecord::new("WY", Some(1)),
        ];
        let cases = vec![CaseRecord::new("WY", day(10)).with_positive(Some(10))];
        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();
        assert_eq!(table.rows[0].positive_per_100k, 2.0);
    }

    #[test]
    fn test_rows_before_baseline_have_null_elapsed_time() {
        let cases = vec![
            CaseRecord::new("WY", day(8)).with_death(Some(2)),
            CaseRecord::new("WY", day(10)).with_positive(Some(10)),
        ];
        let table = compute(&cases, &wyoming(), &first_observations(&cases)).unwrap();

        let before = &table.rows[0];
        assert_eq!(before.date, day(8));
        assert_eq!(before.first_case_date, Some(day(10)));
        assert_eq!(before.days_since_first_case, None);
        assert_eq!(before.decay_multiplier, None);
        assert_eq!(before.adjusted_positive_per_100k, None);
        assert_eq!(before.adjusted_death_per_100k, None);
        assert_eq!(before.death_per_100k, 0.4);

        let baseline_day = &table.rows[1];
        assert_eq!(baseline_day.days_since_first_case, Some(0));
        assert_eq!(baseline_day.decay_multiplier, Some(0.0));
        assert!(table.states_without_baseline.is_empty());
    }

    #[test]
    fn test_elapsed_days() {
        assert_eq!(elapsed_days(day(15), day(10)), Some(5));
        assert_eq!(elapsed_days(day(10), day(10)), Some(0));
        assert_eq!(elapsed_days(day(9), day(10)), None);
    }

    #[test]
    fn test_output_sorted_by_state_then_date() {
        let demographics = vec![
            DemographicRecord::new("56", Some(500_000)),
            DemographicRecord::new("06", Some(39_000_000)),
        ];
        let cases = vec![
            CaseRecord::new("WY", day(12)).with_positive(Some(1)),
            CaseRecord::new("CA", day(11)).with_positive(Some(1)),
            CaseRecord::new("WY", day(10)).with_positive(Some(1)),
            CaseRecord::new("CA", day(10)).with_positive(Some(1)),
        ];
        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();
        let order: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.state.abbreviation(), r.date.format("%d").to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("CA", "10".to_string()),
                ("CA", "11".to_string()),
                ("WY", "10".to_string()),
                ("WY", "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_decay_multiplier_bounds() {
        assert_eq!(decay_multiplier(0), 0.0);
        assert_eq!(decay_multiplier(1), 0.5);
        assert!(decay_multiplier(10_000) < 1.0);
    }
}
