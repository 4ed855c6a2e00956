//! Kubelet volume stats scraping and aggregation
//!
//! Every node's kubelet is read through the API server proxy. The four
//! `kubelet_volume_stats_*` gauges are folded into one [`UsageAggregate`] per
//! `namespace/claim`. A node that cannot be read contributes nothing and the
//! pass carries on.

use crate::domain::{claim_key, ClusterReader, NodeRecord};
use crate::error::{Error, Result};
use crate::inventory::exposition::Exposition;
use crate::inventory::outcome::{cancellable, NodeScrapeReport, ScrapeSource, SourceOutcome};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// =============================================================================
// Constants
// =============================================================================

pub const USED_BYTES_METRIC: &str = "kubelet_volume_stats_used_bytes";
pub const CAPACITY_BYTES_METRIC: &str = "kubelet_volume_stats_capacity_bytes";
pub const INODES_METRIC: &str = "kubelet_volume_stats_inodes";
pub const INODES_USED_METRIC: &str = "kubelet_volume_stats_inodes_used";

const NAMESPACE_LABEL: &str = "namespace";
const CLAIM_LABEL: &str = "persistentvolumeclaim";

/// Primary kubelet metrics path for a node
pub fn metrics_path(node: &str) -> String {
    format!("/api/v1/nodes/{}/proxy/metrics", node)
}

/// Fallback kubelet resource metrics path for a node
pub fn resource_metrics_path(node: &str) -> String {
    format!("/api/v1/nodes/{}/proxy/metrics/resource", node)
}

// =============================================================================
// Usage Aggregate
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum UsageField {
    UsedBytes,
    CapacityBytes,
    InodesTotal,
    InodesUsed,
}

const TRACKED_FAMILIES: [(&str, UsageField); 4] = [
    (USED_BYTES_METRIC, UsageField::UsedBytes),
    (CAPACITY_BYTES_METRIC, UsageField::CapacityBytes),
    (INODES_METRIC, UsageField::InodesTotal),
    (INODES_USED_METRIC, UsageField::InodesUsed),
];

/// Byte and inode usage of one claim
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageAggregate {
    pub used_bytes: f64,
    pub capacity_bytes: f64,
    pub inodes_used: f64,
    pub inodes_total: f64,
}

impl UsageAggregate {
    fn set(&mut self, field: UsageField, value: f64) {
        match field {
            UsageField::UsedBytes => self.used_bytes = value,
            UsageField::CapacityBytes => self.capacity_bytes = value,
            UsageField::InodesTotal => self.inodes_total = value,
            UsageField::InodesUsed => self.inodes_used = value,
        }
    }

    /// Used share of capacity, in percent; `None` without a positive capacity
    pub fn used_percent(&self) -> Option<f64> {
        percent(self.used_bytes, self.capacity_bytes)
    }

    /// Used share of inodes, in percent; `None` without a positive total
    pub fn inodes_used_percent(&self) -> Option<f64> {
        percent(self.inodes_used, self.inodes_total)
    }
}

fn percent(used: f64, total: f64) -> Option<f64> {
    if total > 0.0 {
        Some(used / total * 100.0)
    } else {
        None
    }
}

// =============================================================================
// Usage Index
// =============================================================================

/// Usage aggregates keyed by `namespace/claim`
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    by_claim: IndexMap<String, UsageAggregate>,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one node's document into the index
    ///
    /// Later samples overwrite earlier ones field by field; nothing is summed.
    pub fn apply(&mut self, expo: &Exposition, namespace: Option<&str>) {
        for (family_name, field) in TRACKED_FAMILIES {
            let Some(family) = expo.family(family_name) else {
                continue;
            };

            for sample in &family.samples {
                let (Some(ns), Some(claim)) = (sample.label(NAMESPACE_LABEL), sample.label(CLAIM_LABEL)) else {
                    continue;
                };
                if ns.is_empty() || claim.is_empty() {
                    continue;
                }
                if namespace.is_some_and(|filter| filter != ns) {
                    continue;
                }

                let value = sample.value.gauge_or_untyped().unwrap_or(0.0);
                self.by_claim
                    .entry(claim_key(ns, claim))
                    .or_default()
                    .set(field, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&UsageAggregate> {
        self.by_claim.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_claim.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_claim.is_empty()
    }
}

// =============================================================================
// Scraping
// =============================================================================

/// Fetch and parse one node's kubelet metrics
///
/// `/proxy/metrics` is used when it parses and carries the used-bytes family.
/// When it cannot be fetched, does not parse or lacks that family,
/// `/proxy/metrics/resource` is tried and preferred if it parses. The node
/// fails only when neither path yields a parsed document.
pub async fn scrape_node(
    cluster: &dyn ClusterReader,
    node: &str,
    cancel: &CancellationToken,
) -> Result<(Exposition, ScrapeSource)> {
    let primary_path = metrics_path(node);
    let fetched = cancellable(cancel, &primary_path, cluster.get_raw(&primary_path)).await;

    let (primary, primary_err) = match fetched.and_then(|raw| Exposition::parse(&raw)) {
        Ok(expo) if expo.contains(USED_BYTES_METRIC) => {
            return Ok((expo, ScrapeSource::Primary));
        }
        Ok(expo) => (Some(expo), None),
        Err(e) => {
            debug!("No usable metrics from {}: {}", primary_path, e);
            (None, Some(e))
        }
    };

    let fallback_path = resource_metrics_path(node);
    let fallback = match cancellable(cancel, &fallback_path, cluster.get_raw(&fallback_path)).await {
        Ok(raw) => match Exposition::parse(&raw) {
            Ok(expo) => Some(expo),
            Err(e) => {
                debug!("Unparseable metrics from {}: {}", fallback_path, e);
                None
            }
        },
        Err(e) => {
            debug!("Fallback metrics fetch for node {} failed: {}", node, e);
            None
        }
    };

    match (fallback, primary) {
        (Some(expo), _) => Ok((expo, ScrapeSource::Fallback)),
        (None, Some(expo)) => Ok((expo, ScrapeSource::Primary)),
        (None, None) => Err(primary_err.unwrap_or_else(|| Error::RawFetch {
            path: primary_path,
            reason: "no parseable metrics document".into(),
        })),
    }
}

/// Scrape every node and aggregate claim usage
///
/// Scrapes run `concurrency` at a time. Results are folded one by one in node
/// order, so the overwrite order does not depend on network timing and each
/// document is dropped as soon as it has been applied.
pub async fn collect_usage(
    cluster: &dyn ClusterReader,
    nodes: &[NodeRecord],
    namespace: Option<&str>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> (UsageIndex, Vec<NodeScrapeReport>) {
    let mut scrapes = std::pin::pin!(stream::iter(nodes)
        .map(|node| async move {
            let result = scrape_node(cluster, &node.name, cancel).await;
            (node.name.clone(), result)
        })
        .buffered(concurrency.max(1)));

    let mut usage = UsageIndex::new();
    let mut reports = Vec::with_capacity(nodes.len());

    while let Some((node, result)) = scrapes.next().await {
        match result {
            Ok((expo, source)) => {
                usage.apply(&expo, namespace);
                debug!("Scraped volume stats from node {} ({:?})", node, source);
                reports.push(NodeScrapeReport {
                    node,
                    source: Some(source),
                    outcome: SourceOutcome::Success,
                });
            }
            Err(e) => {
                warn!("Skipping volume stats for node {}: {}", node, e);
                reports.push(NodeScrapeReport {
                    node,
                    source: None,
                    outcome: SourceOutcome::failed(e),
                });
            }
        }
    }

    (usage, reports)
}
