//! Error types for observation data
//!
//! [`DataError`] covers everything that can go wrong before a dataset reaches the
//! likelihood: unreadable files, rows that fail validation and empty results.
//! The fitting core assumes validated input, so these errors are raised at the
//! loading / building boundary and never inside an objective evaluation.

use thiserror::Error;

/// Errors arising from loading or validating observations
#[derive(Error, Debug, Clone)]
pub enum DataError {
    /// The data source could not be opened or read
    #[error("Data unavailable from `{source_name}`: {reason}")]
    Unavailable {
        /// Path or label of the source
        source_name: String,
        /// Underlying reason reported by the reader
        reason: String,
    },

    /// A row could not be read as an observation
    #[error("Malformed row {line} in `{source_name}`: {reason}")]
    MalformedRow {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// An observation violates `z >= 0`, finite value or `sigma > 0`
    #[error("Invalid observation (z = {z}, value = {value}, sigma = {sigma}): {reason}")]
    InvalidObservation {
        z: f64,
        value: f64,
        sigma: f64,
        reason: &'static str,
    },

    /// No valid observations remained
    #[error("No valid observations in `{source_name}`")]
    Empty { source_name: String },
}
