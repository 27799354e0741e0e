//! State identity resolution.
//!
//! Case series key states by postal abbreviation while census estimates key
//! them by numeric FIPS code. [`resolve`] accepts either form and returns the
//! canonical [`StateKey`] both datasets are joined on.

use crate::error::UnknownStateError;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Canonical identifier for a US state, district or territory.
///
/// Ordering follows the FIPS code so that sorted output is stable regardless
/// of which code form the inputs used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    fips: u8,
    abbreviation: &'static str,
    name: &'static str,
}

impl StateKey {
    const fn new(fips: u8, abbreviation: &'static str, name: &'static str) -> Self {
        Self {
            fips,
            abbreviation,
            name,
        }
    }

    /// Numeric FIPS code.
    pub fn fips(&self) -> u8 {
        self.fips
    }

    /// FIPS code rendered the way census tables write it (two digits).
    pub fn fips_code(&self) -> String {
        format!("{:02}", self.fips)
    }

    /// Two-letter postal abbreviation.
    pub fn abbreviation(&self) -> &'static str {
        self.abbreviation
    }

    /// Full name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation)
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.abbreviation)
    }
}

const STATES: &[StateKey] = &[
    StateKey::new(1, "AL", "Alabama"),
    StateKey::new(2, "AK", "Alaska"),
    StateKey::new(4, "AZ", "Arizona"),
    StateKey::new(5, "AR", "Arkansas"),
    StateKey::new(6, "CA", "California"),
    StateKey::new(8, "CO", "Colorado"),
    StateKey::new(9, "CT", "Connecticut"),
    StateKey::new(10, "DE", "Delaware"),
    StateKey::new(11, "DC", "District of Columbia"),
    StateKey::new(12, "FL", "Florida"),
    StateKey::new(13, "GA", "Georgia"),
    StateKey::new(15, "HI", "Hawaii"),
    StateKey::new(16, "ID", "Idaho"),
    StateKey::new(17, "IL", "Illinois"),
    StateKey::new(18, "IN", "Indiana"),
    StateKey::new(19, "IA", "Iowa"),
    StateKey::new(20, "KS", "Kansas"),
    StateKey::new(21, "KY", "Kentucky"),
    StateKey::new(22, "LA", "Louisiana"),
    StateKey::new(23, "ME", "Maine"),
    StateKey::new(24, "MD", "Maryland"),
    StateKey::new(25, "MA", "Massachusetts"),
    StateKey::new(26, "MI", "Michigan"),
    StateKey::new(27, "MN", "Minnesota"),
    StateKey::new(28, "MS", "Mississippi"),
    StateKey::new(29, "MO", "Missouri"),
    StateKey::new(30, "MT", "Montana"),
    StateKey::new(31, "NE", "Nebraska"),
    StateKey::new(32, "NV", "Nevada"),
    StateKey::new(33, "NH", "New Hampshire"),
    StateKey::new(34, "NJ", "New Jersey"),
    StateKey::new(35, "NM", "New Mexico"),
    StateKey::new(36, "NY", "New York"),
    StateKey::new(37, "NC", "North Carolina"),
    StateKey::new(38, "ND", "North Dakota"),
    StateKey::new(39, "OH", "Ohio"),
    StateKey::new(40, "OK", "Oklahoma"),
    StateKey::new(41, "OR", "Oregon"),
    StateKey::new(42, "PA", "Pennsylvania"),
    StateKey::new(44, "RI", "Rhode Island"),
    StateKey::new(45, "SC", "South Carolina"),
    StateKey::new(46, "SD", "South Dakota"),
    StateKey::new(47, "TN", "Tennessee"),
    StateKey::new(48, "TX", "Texas"),
    StateKey::new(49, "UT", "Utah"),
    StateKey::new(50, "VT", "Vermont"),
    StateKey::new(51, "VA", "Virginia"),
    StateKey::new(53, "WA", "Washington"),
    StateKey::new(54, "WV", "West Virginia"),
    StateKey::new(55, "WI", "Wisconsin"),
    StateKey::new(56, "WY", "Wyoming"),
    StateKey::new(60, "AS", "American Samoa"),
    StateKey::new(66, "GU", "Guam"),
    StateKey::new(69, "MP", "Northern Mariana Islands"),
    StateKey::new(72, "PR", "Puerto Rico"),
    StateKey::new(78, "VI", "U.S. Virgin Islands"),
];

static BY_FIPS: Lazy<HashMap<u8, StateKey>> =
    Lazy::new(|| STATES.iter().map(|key| (key.fips, *key)).collect());

static BY_ABBREVIATION: Lazy<HashMap<&'static str, StateKey>> =
    Lazy::new(|| STATES.iter().map(|key| (key.abbreviation, *key)).collect());

/// Resolves a numeric FIPS code or a postal abbreviation.
///
/// Surrounding whitespace is ignored and abbreviations match
/// case-insensitively, so `"06"`, `"6"`, `"CA"` and `" ca "` all resolve to
/// California.
///
/// # Examples
///
/// ```rust
/// use epi_rates::core::state::resolve;
///
/// let by_code = resolve("56").unwrap();
/// let by_abbr = resolve("WY").unwrap();
/// assert_eq!(by_code, by_abbr);
/// assert_eq!(by_code.name(), "Wyoming");
/// assert!(resolve("ZZ").is_err());
/// ```
pub fn resolve(code: &str) -> Result<StateKey, UnknownStateError> {
    let trimmed = code.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<u8>()
            .ok()
            .and_then(|fips| BY_FIPS.get(&fips).copied())
            .ok_or_else(|| UnknownStateError::new(code));
    }
    resolve_abbreviation(trimmed).map_err(|_| UnknownStateError::new(code))
}

/// Resolves a numeric FIPS code.
pub fn resolve_fips(fips: u8) -> Result<StateKey, UnknownStateError> {
    BY_FIPS
        .get(&fips)
        .copied()
        .ok_or_else(|| UnknownStateError::new(fips.to_string()))
}

/// Resolves a postal abbreviation, case-insensitively.
pub fn resolve_abbreviation(abbreviation: &str) -> Result<StateKey, UnknownStateError> {
    let upper = abbreviation.trim().to_ascii_uppercase();
    BY_ABBREVIATION
        .get(upper.as_str())
        .copied()
        .ok_or_else(|| UnknownStateError::new(abbreviation))
}

/// Every entry of the reference table, ordered by FIPS code.
pub fn all() -> &'static [StateKey] {
    STATES
}
