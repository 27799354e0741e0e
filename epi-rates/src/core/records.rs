//! Fixed-shape record types for each entity that flows through the pipeline.

use super::state::StateKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One (state, date) observation from the case series.
///
/// Every count is `None` when the source did not report it. Unreported and
/// reported-zero are different things for baseline detection, so the
/// distinction is kept until rate math coalesces it away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// State code as delivered by the source (postal abbreviation)
    pub state: String,
    pub date: NaiveDate,
    pub positive: Option<i64>,
    pub negative: Option<i64>,
    pub pending: Option<i64>,
    pub hospitalized: Option<i64>,
    pub death: Option<i64>,
    pub total: Option<i64>,
}

impl CaseRecord {
    /// Creates a record with every count unreported.
    pub fn new(state: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            state: state.into(),
            date,
            positive: None,
            negative: None,
            pending: None,
            hospitalized: None,
            death: None,
            total: None,
        }
    }

    pub fn with_positive(mut self, positive: Option<i64>) -> Self {
        self.positive = positive;
        self
    }

    pub fn with_death(mut self, death: Option<i64>) -> Self {
        self.death = death;
        self
    }

    /// Counts in [`crate::columns::CASE_COUNTS`] order.
    pub(crate) fn counts_mut(&mut self) -> [&mut Option<i64>; 6] {
        [
            &mut self.positive,
            &mut self.negative,
            &mut self.pending,
            &mut self.hospitalized,
            &mut self.death,
            &mut self.total,
        ]
    }

    /// Counts with unreported values replaced by zero.
    pub fn coalesced(&self) -> CaseCounts {
        CaseCounts {
            positive: self.positive.unwrap_or(0),
            negative: self.negative.unwrap_or(0),
            pending: self.pending.unwrap_or(0),
            hospitalized: self.hospitalized.unwrap_or(0),
            death: self.death.unwrap_or(0),
            total: self.total.unwrap_or(0),
        }
    }
}

/// Zero-coalesced case counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCounts {
    pub positive: i64,
    pub negative: i64,
    pub pending: i64,
    pub hospitalized: i64,
    pub death: i64,
    pub total: i64,
}

/// Census estimates for one state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    /// State code as delivered by the source (numeric FIPS code)
    pub state: String,
    pub name: Option<String>,
    pub population: Option<i64>,
    pub median_age_male: Option<f64>,
    pub median_age_female: Option<f64>,
    pub white: Option<i64>,
    pub black: Option<i64>,
    pub american_indian: Option<i64>,
    pub asian: Option<i64>,
    pub hispanic: Option<i64>,
    pub commute_drove_alone: Option<i64>,
    pub commute_carpooled: Option<i64>,
    pub commute_public_transit: Option<i64>,
    pub commute_walked: Option<i64>,
    pub commute_worked_from_home: Option<i64>,
    pub uninsured: Option<i64>,
}

impl DemographicRecord {
    /// Creates a record carrying only a code and a population estimate.
    pub fn new(state: impl Into<String>, population: Option<i64>) -> Self {
        Self {
            state: state.into(),
            population,
            ..Default::default()
        }
    }

    /// Counts in [`crate::columns::DEMOGRAPHIC_COUNTS`] order.
    pub(crate) fn counts(&self) -> [Option<i64>; 11] {
        [
            self.white,
            self.black,
            self.american_indian,
            self.asian,
            self.hispanic,
            self.commute_drove_alone,
            self.commute_carpooled,
            self.commute_public_transit,
            self.commute_walked,
            self.commute_worked_from_home,
            self.uninsured,
        ]
    }

    pub(crate) fn counts_mut(&mut self) -> [&mut Option<i64>; 11] {
        [
            &mut self.white,
            &mut self.black,
            &mut self.american_indian,
            &mut self.asian,
            &mut self.hispanic,
            &mut self.commute_drove_alone,
            &mut self.commute_carpooled,
            &mut self.commute_public_transit,
            &mut self.commute_walked,
            &mut self.commute_worked_from_home,
            &mut self.uninsured,
        ]
    }
}

/// One (state, date) row of the derived metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub state: StateKey,
    pub date: NaiveDate,
    pub counts: CaseCounts,
    pub demographics: DemographicRecord,
    pub first_case_date: Option<NaiveDate>,
    pub days_since_first_case: Option<i64>,
    pub positive_per_100k: f64,
    pub death_per_100k: f64,
    pub decay_multiplier: Option<f64>,
    pub adjusted_positive_per_100k: Option<f64>,
    pub adjusted_death_per_100k: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesced_replaces_unreported_with_zero() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 10).unwrap();
        let mut record = CaseRecord::new("WY", date).with_positive(Some(10));
        record.total = Some(42);

        let counts = record.coalesced();
        assert_eq!(counts.positive, 10);
        assert_eq!(counts.total, 42);
        assert_eq!(counts.death, 0);
        assert_eq!(counts.pending, 0);
        assert_eq!(record.death, None);
    }

    #[test]
    fn test_demographic_new_leaves_other_fields_empty() {
        let record = DemographicRecord::new("56", Some(500_000));
        assert_eq!(record.population, Some(500_000));
        assert!(record.name.is_none());
        assert!(record.uninsured.is_none());
    }
}
