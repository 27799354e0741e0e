//! Error types for the epi-rates pipeline.
//!
//! All fallible operations return [`Result`], whose error side is [`EpiError`].
//! The two per-record conditions the metrics pipeline can raise,
//! [`UnknownStateError`] and [`InvalidPopulationError`], are standalone types
//! so they can be carried inside row rejections as well as returned as errors.

use thiserror::Error;

/// A geographic code that matches no entry in the state reference table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown state code '{code}'")]
pub struct UnknownStateError {
    /// The code exactly as it appeared in the input
    pub code: String,
}

impl UnknownStateError {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// A population estimate that cannot serve as a rate denominator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid population {} for state {state}", display_population(.population))]
pub struct InvalidPopulationError {
    /// Postal abbreviation of the affected state
    pub state: String,
    /// The offending estimate; `None` when the source left it blank
    pub population: Option<i64>,
}

fn display_population(population: &Option<i64>) -> String {
    match population {
        Some(value) => value.to_string(),
        None => "<missing>".to_string(),
    }
}

/// The main error type for the epi-rates library.
#[derive(Error, Debug)]
pub enum EpiError {
    /// A state code could not be resolved.
    #[error(transparent)]
    UnknownState(#[from] UnknownStateError),

    /// A state has a zero, negative or missing population.
    #[error(transparent)]
    InvalidPopulation(#[from] InvalidPopulationError),

    /// A credential file could not be read.
    #[error("Failed to load credentials from '{path}': {message}")]
    CredentialLoad {
        /// Path of the credential file
        path: String,
        /// Detailed error message
        message: String,
    },

    /// Error from a case or demographic source.
    #[error("Data source error ({source_type}): {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "CovidTracking", "Census")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required column is missing from a loaded table.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when parsing field values.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the HTTP client used by remote sources.
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, EpiError>`.
pub type Result<T> = std::result::Result<T, EpiError>;

impl EpiError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a credential loading error.
    pub fn credential_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CredentialLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<EpiError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            EpiError::Internal(inner) => EpiError::Internal(format!("{msg}: {inner}")),
            other => EpiError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                EpiError::Internal(inner) => EpiError::Internal(format!("{msg}: {inner}")),
                other => EpiError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
