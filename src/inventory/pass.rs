//! One inventory pass
//!
//! ```text
//! list PVs ─┐
//! list Nodes├─ fatal ─┐
//! list PVCs ┘         ├─ Topology ─┬─ kubelet scrapes ──┐
//! list Pods ── soft ──┘            └─ describe batches ─┴─ Correlator ─ rows
//! ```

use crate::config::InventoryConfig;
use crate::domain::{ClusterReaderRef, PodAttachment, VolumeDescriberRef};
use crate::error::{Error, Result};
use crate::inventory::correlate::Correlator;
use crate::inventory::metrics::collect_usage;
use crate::inventory::outcome::{cancellable, PassDiagnostics, SourceOutcome};
use crate::inventory::report::ReportRow;
use crate::inventory::topology::Topology;
use crate::inventory::volume_types::fetch_volume_types;
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Context and Result
// =============================================================================

/// Read sources for a pass
#[derive(Clone)]
pub struct CorrelationContext {
    pub cluster: ClusterReaderRef,
    /// Volume type provider; `None` leaves VTYPE unresolved
    pub cloud: Option<VolumeDescriberRef>,
}

impl CorrelationContext {
    pub fn new(cluster: ClusterReaderRef) -> Self {
        Self {
            cluster,
            cloud: None,
        }
    }

    pub fn with_cloud(mut self, cloud: VolumeDescriberRef) -> Self {
        self.cloud = Some(cloud);
        self
    }
}

/// Rows of a pass plus a record of every source that degraded
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub rows: Vec<ReportRow>,
    pub diagnostics: PassDiagnostics,
}

// =============================================================================
// Deadline
// =============================================================================

/// Cancels a token once the pass deadline passes; disarmed on drop
struct DeadlineGuard {
    handle: JoinHandle<()>,
}

impl DeadlineGuard {
    fn arm(timeout: Duration, token: CancellationToken) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("Inventory pass exceeded {:?}; cancelling outstanding reads", timeout);
            token.cancel();
        });
        Self { handle }
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Pass
// =============================================================================

async fn required_list<T, F>(kind: &'static str, cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    cancellable(cancel, kind, fut)
        .await
        .map_err(|e| Error::list_failed(kind, e))
}

/// Build the report
///
/// Fails only when volumes, nodes or claims cannot be listed, or when the
/// configuration is invalid. Everything else degrades into placeholders and
/// is recorded in [`Inventory::diagnostics`].
pub async fn run_pass(
    ctx: &CorrelationContext,
    config: &InventoryConfig,
    cancel: CancellationToken,
) -> Result<Inventory> {
    config.validate()?;

    let cancel = cancel.child_token();
    let _deadline = config
        .timeout
        .map(|timeout| DeadlineGuard::arm(timeout, cancel.clone()));

    let namespace = config.namespace_filter();
    let cluster = ctx.cluster.as_ref();
    let mut diagnostics = PassDiagnostics::default();

    debug!(
        "Starting inventory pass (namespace: {})",
        namespace.unwrap_or("all")
    );

    let required = async {
        tokio::try_join!(
            required_list("PersistentVolumes", &cancel, cluster.list_volumes()),
            required_list("Nodes", &cancel, cluster.list_nodes()),
            required_list("PersistentVolumeClaims", &cancel, cluster.list_claims(namespace)),
        )
    };
    let pods = cancellable(&cancel, "Pods", cluster.list_pods(namespace));

    let (required, pods) = tokio::join!(required, pods);
    let (volumes, nodes, claims) = required?;

    let pods: Vec<PodAttachment> = match pods {
        Ok(pods) => {
            diagnostics.pods = SourceOutcome::Success;
            pods
        }
        Err(e) => {
            warn!("Failed to list pods, NODE_ID will be empty: {}", e);
            diagnostics.pods = SourceOutcome::failed(e);
            Vec::new()
        }
    };

    debug!(
        "Listed {} volumes, {} nodes, {} claims, {} pods",
        volumes.len(),
        nodes.len(),
        claims.len(),
        pods.len()
    );

    let topology = Topology::build(volumes, &nodes, &pods);
    let volume_ids = topology.volumes.volume_ids();
    debug!(
        "Indexed {} volumes ({} cloud ids), {} nodes, {} attached claims",
        topology.volumes.len(),
        volume_ids.len(),
        topology.instances.len(),
        topology.attachments.len()
    );

    let ((usage, node_scrapes), lookup) = tokio::join!(
        collect_usage(cluster, &nodes, namespace, config.metrics_concurrency, &cancel),
        fetch_volume_types(
            ctx.cloud.as_deref(),
            &volume_ids,
            config.describe_batch_size,
            config.describe_concurrency,
            &cancel,
        ),
    );

    diagnostics.node_scrapes = node_scrapes;
    diagnostics.volume_types = lookup.outcome;
    diagnostics.describe_batches = lookup.batches;

    let rows = Correlator::new(&topology, &usage, &lookup.types, Utc::now()).rows(&claims);

    info!(
        "Inventory: {} claims, {}/{} nodes scraped, {} volume types resolved, {} describe batches failed",
        rows.len(),
        diagnostics.nodes_scraped(),
        diagnostics.node_scrapes.len(),
        lookup.types.len(),
        diagnostics.batches_failed()
    );

    Ok(Inventory { rows, diagnostics })
}
