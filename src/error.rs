//! Error types for the volume inventory
//!
//! Only foundational reads (volumes, claims, nodes) surface as errors from an
//! inventory pass. Everything else degrades into a [`SourceOutcome`] and a
//! placeholder in the report.
//!
//! [`SourceOutcome`]: crate::inventory::SourceOutcome

use thiserror::Error;

/// Unified error type for the inventory
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to list {kind}: {source}")]
    ListFailed {
        kind: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Raw fetch of {path} failed: {reason}")]
    RawFetch { path: String, reason: String },

    #[error("Kubernetes client setup failed: {0}")]
    KubeConfig(String),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metric exposition parse error at line {line}: {reason}")]
    MetricParse { line: usize, reason: String },

    // =========================================================================
    // Cloud Provider Errors
    // =========================================================================
    #[error("Cloud provider error: {operation} - {reason}")]
    CloudProvider { operation: String, reason: String },

    // =========================================================================
    // Pass Control
    // =========================================================================
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    // =========================================================================
    // Output Errors
    // =========================================================================
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML encode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a failed foundational list call
    pub fn list_failed(kind: &'static str, source: Error) -> Self {
        Error::ListFailed {
            kind,
            source: Box::new(source),
        }
    }

    /// Whether this error ends an inventory pass without emitting rows
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ListFailed { .. }
                | Error::Cancelled { .. }
                | Error::Configuration(_)
                | Error::KubeConfig(_)
        )
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Kube(_) | Error::RawFetch { .. } | Error::CloudProvider { .. } => true,
            Error::ListFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias for the inventory
pub type Result<T> = std::result::Result<T, Error>;
