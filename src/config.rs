//! Inventory pass configuration

use crate::error::{Error, Result};
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Upper bound on volume ids per DescribeVolumes call
pub const DEFAULT_DESCRIBE_BATCH_SIZE: usize = 200;

/// Nodes scraped concurrently
pub const DEFAULT_METRICS_CONCURRENCY: usize = 8;

/// Describe batches in flight concurrently
pub const DEFAULT_DESCRIBE_CONCURRENCY: usize = 4;

// =============================================================================
// Inventory Configuration
// =============================================================================

/// Configuration for one inventory pass
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Restrict claims, pods and usage metrics to one namespace
    pub namespace: Option<String>,
    /// Maximum concurrent kubelet scrapes
    pub metrics_concurrency: usize,
    /// Maximum concurrent describe calls
    pub describe_concurrency: usize,
    /// Volume ids per describe call
    pub describe_batch_size: usize,
    /// Deadline for the whole pass
    pub timeout: Option<Duration>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            metrics_concurrency: DEFAULT_METRICS_CONCURRENCY,
            describe_concurrency: DEFAULT_DESCRIBE_CONCURRENCY,
            describe_batch_size: DEFAULT_DESCRIBE_BATCH_SIZE,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl InventoryConfig {
    /// Set the namespace filter; an empty string means all namespaces
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    /// The active namespace filter, if any
    pub fn namespace_filter(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Reject settings that would stall or divide the pass into nothing
    pub fn validate(&self) -> Result<()> {
        if self.metrics_concurrency == 0 {
            return Err(Error::Configuration(
                "metrics concurrency must be at least 1".into(),
            ));
        }
        if self.describe_concurrency == 0 {
            return Err(Error::Configuration(
                "describe concurrency must be at least 1".into(),
            ));
        }
        if self.describe_batch_size == 0 || self.describe_batch_size > DEFAULT_DESCRIBE_BATCH_SIZE {
            return Err(Error::Configuration(format!(
                "describe batch size must be between 1 and {}",
                DEFAULT_DESCRIBE_BATCH_SIZE
            )));
        }
        Ok(())
    }
}
