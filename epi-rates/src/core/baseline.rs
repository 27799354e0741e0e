//! First-observation baselines.

use super::records::CaseRecord;
use super::state::{self, StateKey};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Earliest qualifying observation date per state.
///
/// A state with no entry has no baseline; callers treat absence as
/// "missing baseline", never as an error.
pub type FirstObservations = BTreeMap<StateKey, NaiveDate>;

/// Derives the first date each state reported a positive-case value.
///
/// A record qualifies when `positive` is present, including a reported zero.
/// Records whose state code does not resolve contribute nothing here; the
/// metrics pipeline is where they surface as rejections.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use epi_rates::core::baseline::first_observations;
/// use epi_rates::core::records::CaseRecord;
/// use epi_rates::core::state::resolve;
///
/// let d = |day| NaiveDate::from_ymd_opt(2020, 3, day).unwrap();
/// let cases = vec![
///     CaseRecord::new("WY", d(9)),
///     CaseRecord::new("WY", d(12)).with_positive(Some(3)),
///     CaseRecord::new("WY", d(10)).with_positive(Some(0)),
/// ];
///
/// let baselines = first_observations(&cases);
/// assert_eq!(baselines[&resolve("WY").unwrap()], d(10));
/// ```
pub fn first_observations(cases: &[CaseRecord]) -> FirstObservations {
    let mut baselines = FirstObservations::new();

    for record in cases.iter().filter(|record| record.positive.is_some()) {
        let key = match state::resolve(&record.state) {
            Ok(key) => key,
            Err(err) => {
                debug!(
                    state = %record.state,
                    date = %record.date,
                    "Skipping baseline candidate: {err}"
                );
                continue;
            }
        };

        baselines
            .entry(key)
            .and_modify(|first| {
                if record.date < *first {
                    *first = record.date;
                }
            })
            .or_insert(record.date);
    }

    debug!(states = baselines.len(), "Derived first observations");
    baselines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::resolve;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn test_minimum_over_qualifying_records() {
        let cases = vec![
            CaseRecord::new("NY", day(15)).with_positive(Some(100)),
            CaseRecord::new("NY", day(4)).with_positive(Some(1)),
            CaseRecord::new("NY", day(9)).with_positive(Some(20)),
            CaseRecord::new("CA", day(6)).with_positive(Some(5)),
        ];

        let baselines = first_observations(&cases);
        assert_eq!(baselines.len(), 2);
        assert_eq!(baselines[&resolve("NY").unwrap()], day(4));
        assert_eq!(baselines[&resolve("CA").unwrap()], day(6));
    }

    #[test]
    fn test_reported_zero_counts_and_unreported_does_not() {
        let cases = vec![
            CaseRecord::new("WY", day(1)),
            CaseRecord::new("WY", day(2)).with_positive(Some(0)),
            CaseRecord::new("WY", day(3)).with_positive(Some(7)),
        ];

        let baselines = first_observations(&cases);
        assert_eq!(baselines[&resolve("WY").unwrap()], day(2));
    }

    #[test]
    fn test_state_without_qualifying_records_has_no_entry() {
        let cases = vec![
            CaseRecord::new("VT", day(1)).with_death(Some(0)),
            CaseRecord::new("VT", day(2)),
        ];

        let baselines = first_observations(&cases);
        assert!(baselines.is_empty());
    }

    #[test]
    fn test_unknown_codes_are_skipped() {
        let cases = vec![
            CaseRecord::new("ZZ", day(1)).with_positive(Some(1)),
            CaseRecord::new("wy", day(3)).with_positive(Some(1)),
        ];

        let baselines = first_observations(&cases);
        assert_eq!(baselines.len(), 1);
        assert_eq!(baselines[&resolve("WY").unwrap()], day(3));
    }

    #[test]
    fn test_duplicate_minimum_dates() {
        let cases = vec![
            CaseRecord::new("TX", day(5)).with_positive(Some(1)),
            CaseRecord::new("TX", day(5)).with_positive(Some(2)),
        ];

        assert_eq!(first_observations(&cases)[&resolve("TX").unwrap()], day(5));
    }
}
