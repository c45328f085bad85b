//! Error types for model construction and the index bridge.
//!
//! Pure set-algebra operations (union/intersection/difference/containment)
//! over well-formed values are total and never produce errors. Everything
//! that can fail does so while building the model or while translating
//! between peers and index intervals.

/// Errors that can occur while building or indexing the network model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A string that should have been an IP address or CIDR could not be parsed
    #[error("invalid address or CIDR literal '{literal}': {reason}")]
    AddressFormat { literal: String, reason: String },

    /// An exception CIDR handed to `add_cidr` reaches outside its target CIDR
    #[error("exception CIDR '{exception}' is not contained in '{cidr}'")]
    Containment { cidr: String, exception: String },

    /// A peer set would exceed the maximum number of concrete endpoints.
    /// This signals a modeling defect upstream and is not retryable.
    #[error("peer set exceeds the maximum of {limit} concrete endpoints")]
    Capacity { limit: usize },

    /// An index interval lies outside the declared peer segments
    #[error("index interval '{interval}' is outside the declared peer segments")]
    IndexRange { interval: String },
}

/// Result type alias using [`ModelError`]
pub type Result<T> = std::result::Result<T, ModelError>;
