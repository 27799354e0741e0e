//! Column names of the metrics table, in output order.
//!
//! Both the CSV sink and [`crate::core::EpiContext::register_metrics`] use
//! these, so SQL over a registered table and the written file agree.

pub const ROW: &str = "row";

pub const STATE: &str = "state";
pub const STATE_FIPS: &str = "state_fips";
pub const STATE_NAME: &str = "state_name";
pub const DATE: &str = "date";

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";
pub const PENDING: &str = "pending";
pub const HOSPITALIZED: &str = "hospitalized";
pub const DEATH: &str = "death";
pub const TOTAL: &str = "total";

pub const POPULATION: &str = "population";
pub const MEDIAN_AGE_MALE: &str = "median_age_male";
pub const MEDIAN_AGE_FEMALE: &str = "median_age_female";
pub const WHITE: &str = "white";
pub const BLACK: &str = "black";
pub const AMERICAN_INDIAN: &str = "american_indian";
pub const ASIAN: &str = "asian";
pub const HISPANIC: &str = "hispanic";
pub const COMMUTE_DROVE_ALONE: &str = "commute_drove_alone";
pub const COMMUTE_CARPOOLED: &str = "commute_carpooled";
pub const COMMUTE_PUBLIC_TRANSIT: &str = "commute_public_transit";
pub const COMMUTE_WALKED: &str = "commute_walked";
pub const COMMUTE_WORKED_FROM_HOME: &str = "commute_worked_from_home";
pub const UNINSURED: &str = "uninsured";

pub const FIRST_CASE_DATE: &str = "first_case_date";
pub const DAYS_SINCE_FIRST_CASE: &str = "days_since_first_case";
pub const POSITIVE_PER_100K: &str = "positive_per_100k";
pub const DEATH_PER_100K: &str = "death_per_100k";
pub const DECAY_MULTIPLIER: &str = "decay_multiplier";
pub const ADJUSTED_POSITIVE_PER_100K: &str = "adjusted_positive_per_100k";
pub const ADJUSTED_DEATH_PER_100K: &str = "adjusted_death_per_100k";

/// Case-count columns, shared by the case CSV input and the output table.
pub const CASE_COUNTS: [&str; 6] = [POSITIVE, NEGATIVE, PENDING, HOSPITALIZED, DEATH, TOTAL];

/// Integer demographic columns other than population, shared by the
/// demographic CSV input and the output table.
pub const DEMOGRAPHIC_COUNTS: [&str; 11] = [
    WHITE,
    BLACK,
    AMERICAN_INDIAN,
    ASIAN,
    HISPANIC,
    COMMUTE_DROVE_ALONE,
    COMMUTE_CARPOOLED,
    COMMUTE_PUBLIC_TRANSIT,
    COMMUTE_WALKED,
    COMMUTE_WORKED_FROM_HOME,
    UNINSURED,
];
