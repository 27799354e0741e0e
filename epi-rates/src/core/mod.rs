//! Core domain types and the metrics pipeline.
//!
//! ```text
//! CaseRecord ──┐
//!              ├─ first_observations ─► FirstObservations ─┐
//!              └──────────────────────────────────────────┤
//! DemographicRecord ──────────────────────────────────────┴─► compute ─► MetricsTable
//! ```
//!
//! - [`state`]: canonical state identity and code resolution
//! - [`records`]: input and output row types
//! - [`baseline`]: first reported positive per state
//! - [`metrics`]: joins and derived rates
//! - [`context`]: DataFusion session used by the file loaders

pub mod baseline;
pub mod context;
pub mod metrics;
pub mod records;
pub mod state;

pub use baseline::{first_observations, FirstObservations};
pub use context::{CsvLayout, EpiContext, EpiContextConfig};
pub use metrics::{
    compute, compute_with_policy, decay_multiplier, elapsed_days, rate_per_100k, MetricsTable,
    RejectPolicy, RejectionReason, RowRejection, RATE_SCALE,
};
pub use records::{CaseCounts, CaseRecord, DemographicRecord, MetricRow};
pub use state::StateKey;
