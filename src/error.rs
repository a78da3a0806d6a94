//! # Error Types
//!
//! All fallible library operations return [`Result`], whose error side is the
//! [`Error`] enum below. Verification mismatches are not errors: they are
//! reported through [`crate::verify::VerificationResult`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, extracting, serializing or verifying
/// regional subsets.
#[derive(Error, Debug)]
pub enum Error {
    /// A coordinate or date lies outside the range covered by its axis.
    #[error("{axis} value {value} out of bounds [{lower}, {upper}]")]
    OutOfBounds {
        axis: String,
        value: String,
        lower: String,
        upper: String,
    },

    /// The dataset (or artifact) file does not exist.
    #[error("source not found: {}", path.display())]
    MissingSource { path: PathBuf },

    /// The resolved window contains no rows.
    #[error("no data to save: window over {variable} resolved to zero rows")]
    EmptyResult { variable: String },

    /// Header, column or dimension layouts disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("dataset has several candidate data variables: {}", candidates.join(", "))]
    AmbiguousVariable { candidates: Vec<String> },

    #[error("variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("axis '{0}' is empty")]
    EmptyAxis(String),

    #[error("variable '{variable}' has no '{attribute}' attribute")]
    MissingAttribute { variable: String, attribute: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time units '{0}'")]
    InvalidTimeUnits(String),

    #[error("unsupported calendar '{0}'")]
    UnsupportedCalendar(String),

    #[error("date {0} not found in dataset")]
    DateNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("station lookup failed for '{city}': {reason}")]
    StationLookup { city: String, reason: String },

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn out_of_bounds(
        axis: &str,
        value: impl ToString,
        lower: impl ToString,
        upper: impl ToString,
    ) -> Self {
        Error::OutOfBounds {
            axis: axis.to_string(),
            value: value.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }
}

/// Result type for ncregion operations
pub type Result<T> = std::result::Result<T, Error>;
