//! Per-source outcomes of an inventory pass
//!
//! Soft failures never become errors. They are recorded here and returned next
//! to the rows so callers and tests can see exactly which sources degraded.

use crate::error::{Error, Result};
use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Source Outcome
// =============================================================================

/// What happened to one read source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceOutcome {
    /// Read and used
    Success,
    /// Not attempted
    Skipped { reason: String },
    /// Attempted and dropped
    Failed { reason: String },
}

impl SourceOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        SourceOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        SourceOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

impl std::fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceOutcome::Success => write!(f, "ok"),
            SourceOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
            SourceOutcome::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

// =============================================================================
// Per-Node and Per-Batch Reports
// =============================================================================

/// Which kubelet endpoint produced a node's metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeSource {
    /// `/proxy/metrics`
    Primary,
    /// `/proxy/metrics/resource`
    Fallback,
}

/// Scrape result for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeScrapeReport {
    pub node: String,
    pub source: Option<ScrapeSource>,
    pub outcome: SourceOutcome,
}

/// Describe result for one batch of volume ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Zero-based batch position
    pub index: usize,
    /// Number of ids sent
    pub size: usize,
    /// Number of ids that came back with a type
    pub resolved: usize,
    pub outcome: SourceOutcome,
}

// =============================================================================
// Pass Diagnostics
// =============================================================================

/// Degradation record for a whole pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassDiagnostics {
    /// Pod listing (feeds the NODE_ID column)
    pub pods: SourceOutcome,
    /// Volume type lookup as a whole
    pub volume_types: SourceOutcome,
    pub node_scrapes: Vec<NodeScrapeReport>,
    pub describe_batches: Vec<BatchReport>,
}

impl Default for PassDiagnostics {
    fn default() -> Self {
        Self {
            pods: SourceOutcome::skipped("not attempted"),
            volume_types: SourceOutcome::skipped("not attempted"),
            node_scrapes: Vec::new(),
            describe_batches: Vec::new(),
        }
    }
}

impl PassDiagnostics {
    pub fn nodes_scraped(&self) -> usize {
        self.node_scrapes
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn nodes_failed(&self) -> usize {
        self.node_scrapes
            .iter()
            .filter(|r| r.outcome.is_failed())
            .count()
    }

    pub fn batches_failed(&self) -> usize {
        self.describe_batches
            .iter()
            .filter(|r| r.outcome.is_failed())
            .count()
    }

    /// Whether every source was read in full
    pub fn is_complete(&self) -> bool {
        self.pods.is_success()
            && self.volume_types.is_success()
            && self.nodes_failed() == 0
            && self.batches_failed() == 0
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Run `fut` unless `cancel` fires first
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    operation: &str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled {
            operation: operation.to_string(),
        }),
        result = fut => result,
    }
}
