//! Error types for the vCenter export pipeline.

use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an export run.
///
/// Configuration and enumeration errors are fatal and abort the run before
/// (or instead of) collection. A per-VM/per-counter performance query
/// failure is recoverable and is consumed inside the sample aggregator,
/// which records a defined-zero metric plus a data-quality note instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (bad skip pattern, non-positive window,
    /// missing credentials). Always fatal, surfaced before collection.
    #[error("configuration error: {0}")]
    Config(String),

    /// A skip-list pattern failed to compile.
    #[error("invalid skip pattern `{pattern}`: {source}")]
    SkipPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Inventory enumeration failed. Fatal: no export set can be formed.
    #[error("inventory enumeration failed: {0}")]
    Enumerate(String),

    /// A single performance query failed. Recoverable per counter.
    #[error("performance query failed for VM {vm} counter {counter}: {message}")]
    Query {
        vm: String,
        counter: String,
        message: String,
    },

    /// vCenter session could not be established.
    #[error("authentication with vCenter failed")]
    Auth,

    /// vCenter API returned an error status.
    #[error("vCenter API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport or response-decoding failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV serialization failure.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
