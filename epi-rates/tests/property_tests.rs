//! Property-based tests for state resolution, baselines and the metrics
//! pipeline.
//!
//! Inputs are generated over the reference state table, with dates spread
//! across a few months, positive counts that are sometimes unreported, and
//! demographics covering a random subset of states.

use chrono::{Duration, NaiveDate};
use epi_rates::core::state;
use epi_rates::core::{compute, first_observations, CaseRecord, DemographicRecord};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 22).unwrap()
}

fn state_index() -> impl Strategy<Value = usize> {
    0..state::all().len()
}

/// One case record: (state index, day offset, positive, death).
fn case_strategy() -> impl Strategy<Value = (usize, i64, Option<i64>, Option<i64>)> {
    (
        state_index(),
        0i64..120,
        prop::option::of(0i64..1_000_000),
        prop::option::of(0i64..50_000),
    )
}

fn build_cases(raw: &[(usize, i64, Option<i64>, Option<i64>)]) -> Vec<CaseRecord> {
    raw.iter()
        .map(|&(idx, offset, positive, death)| {
            CaseRecord::new(
                state::all()[idx].abbreviation(),
                base_date() + Duration::days(offset),
            )
            .with_positive(positive)
            .with_death(death)
        })
        .collect()
}

fn build_demographics(states: &HashSet<usize>, population: i64) -> Vec<DemographicRecord> {
    states
        .iter()
        .map(|&idx| DemographicRecord::new(state::all()[idx].fips_code(), Some(population)))
        .collect()
}

proptest! {
    #[test]
    fn prop_resolver_round_trip(idx in state_index()) {
        let key = state::all()[idx];
        prop_assert_eq!(state::resolve(&key.fips_code()).unwrap(), key);
        prop_assert_eq!(state::resolve(&key.fips().to_string()).unwrap(), key);
        prop_assert_eq!(state::resolve(key.abbreviation()).unwrap(), key);
        prop_assert_eq!(
            state::resolve(&key.abbreviation().to_lowercase()).unwrap(),
            key
        );
    }

    #[test]
    fn prop_unmapped_two_letter_codes_are_errors(code in "[A-Z]{2}") {
        let known = state::all().iter().any(|s| s.abbreviation() == code);
        prop_assert_eq!(state::resolve(&code).is_ok(), known);
    }

    #[test]
    fn prop_first_observation_is_min_reported_date(
        raw in prop::collection::vec(case_strategy(), 0..200)
    ) {
        let cases = build_cases(&raw);
        let firsts = first_observations(&cases);

        let mut expected: BTreeMap<_, NaiveDate> = BTreeMap::new();
        for record in cases.iter().filter(|r| r.positive.is_some()) {
            let key = state::resolve(&record.state).unwrap();
            expected
                .entry(key)
                .and_modify(|d| *d = (*d).min(record.date))
                .or_insert(record.date);
        }
        prop_assert_eq!(firsts, expected);
    }

    #[test]
    fn prop_inner_join_keeps_only_demographic_states(
        raw in prop::collection::vec(case_strategy(), 1..150),
        covered in prop::collection::hash_set(state_index(), 0..20),
    ) {
        let cases = build_cases(&raw);
        let demographics = build_demographics(&covered, 1_000_000);
        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();

        let allowed: HashSet<_> = covered.iter().map(|&idx| state::all()[idx]).collect();
        for row in &table.rows {
            prop_assert!(allowed.contains(&row.state));
        }
        for unmatched in &table.unmatched_states {
            prop_assert!(!allowed.contains(unmatched));
        }
        let joined = raw.iter().filter(|(idx, ..)| covered.contains(idx)).count();
        prop_assert_eq!(table.rows.len(), joined);
        prop_assert!(table.rejections.is_empty());
    }

    #[test]
    fn prop_multiplier_and_adjusted_rates_are_consistent(
        raw in prop::collection::vec(case_strategy(), 1..150),
        population in 1i64..50_000_000,
    ) {
        let cases = build_cases(&raw);
        let every_state: HashSet<usize> = (0..state::all().len()).collect();
        let demographics = build_demographics(&every_state, population);
        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();

        for row in &table.rows {
            prop_assert!(row.positive_per_100k >= 0.0);
            prop_assert!(row.positive_per_100k.is_finite());

            match (row.days_since_first_case, row.decay_multiplier) {
                (Some(elapsed), Some(multiplier)) => {
                    prop_assert!(elapsed >= 0);
                    prop_assert!((0.0..1.0).contains(&multiplier));
                    prop_assert_eq!(multiplier == 0.0, elapsed == 0);

                    let adjusted = row.adjusted_positive_per_100k.unwrap();
                    prop_assert_eq!(adjusted, row.positive_per_100k * multiplier);
                    let adjusted_death = row.adjusted_death_per_100k.unwrap();
                    prop_assert_eq!(adjusted_death, row.death_per_100k * multiplier);
                }
                (None, None) => {
                    prop_assert!(row.first_case_date.map_or(true, |first| row.date < first));
                    prop_assert!(row.adjusted_positive_per_100k.is_none());
                    prop_assert!(row.adjusted_death_per_100k.is_none());
                }
                other => prop_assert!(false, "elapsed and multiplier disagree: {:?}", other),
            }
        }
    }

    #[test]
    fn prop_output_is_sorted_and_deterministic(
        raw in prop::collection::vec(case_strategy(), 0..100)
    ) {
        let cases = build_cases(&raw);
        let every_state: HashSet<usize> = (0..state::all().len()).collect();
        let demographics = build_demographics(&every_state, 100_000);
        let firsts = first_observations(&cases);

        let first = compute(&cases, &demographics, &firsts).unwrap();
        let second = compute(&cases, &demographics, &firsts).unwrap();
        prop_assert_eq!(&first, &second);

        for pair in first.rows.windows(2) {
            prop_assert!((pair[0].state, pair[0].date) <= (pair[1].state, pair[1].date));
        }
    }
}
