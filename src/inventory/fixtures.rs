//! In-memory cluster and cloud fakes for engine tests

use crate::domain::{
    ClaimRecord, ClusterReader, NodeRecord, PodAttachment, VolumeDescriber, VolumeDescriptor,
    VolumeRecord,
};
use crate::error::{Error, Result};
use crate::inventory::metrics::{metrics_path, resource_metrics_path};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

// =============================================================================
// Fake Cluster
// =============================================================================

#[derive(Default)]
pub(crate) struct FakeCluster {
    pub volumes: Vec<VolumeRecord>,
    pub claims: Vec<ClaimRecord>,
    pub nodes: Vec<NodeRecord>,
    pub pods: Vec<PodAttachment>,
    /// Raw documents by API path; a missing path fails the fetch
    pub documents: HashMap<String, String>,
    /// List kinds that fail: "volumes", "claims", "nodes", "pods"
    pub failing_lists: HashSet<&'static str>,
    /// Paths whose fetch never completes
    pub stalled_paths: HashSet<String>,
    /// Paths whose fetch completes only after a delay
    pub delayed_paths: HashMap<String, Duration>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn with_metrics(mut self, node: &str, text: &str) -> Self {
        self.documents.insert(metrics_path(node), text.to_string());
        self
    }

    pub fn with_resource_metrics(mut self, node: &str, text: &str) -> Self {
        self.documents
            .insert(resource_metrics_path(node), text.to_string());
        self
    }

    pub fn failing(mut self, kind: &'static str) -> Self {
        self.failing_lists.insert(kind);
        self
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn check(&self, kind: &'static str) -> Result<()> {
        if self.failing_lists.contains(kind) {
            return Err(Error::RawFetch {
                path: kind.to_string(),
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        self.check("volumes")?;
        Ok(self.volumes.clone())
    }

    async fn list_claims(&self, namespace: Option<&str>) -> Result<Vec<ClaimRecord>> {
        self.check("claims")?;
        Ok(self
            .claims
            .iter()
            .filter(|c| namespace.map_or(true, |ns| c.namespace == ns))
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        self.check("nodes")?;
        Ok(self.nodes.clone())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodAttachment>> {
        self.check("pods")?;
        Ok(self
            .pods
            .iter()
            .filter(|p| namespace.map_or(true, |ns| p.namespace == ns))
            .cloned()
            .collect())
    }

    async fn get_raw(&self, path: &str) -> Result<String> {
        self.requested.lock().unwrap().push(path.to_string());
        if self.stalled_paths.contains(path) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delayed_paths.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.documents.get(path).cloned().ok_or_else(|| Error::RawFetch {
            path: path.to_string(),
            reason: "503 Service Unavailable".into(),
        })
    }
}

// =============================================================================
// Fake Describer
// =============================================================================

#[derive(Default)]
pub(crate) struct FakeDescriber {
    /// Volume id to type
    pub types: HashMap<String, String>,
    /// Any batch containing one of these ids fails
    pub poison_ids: HashSet<String>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FakeDescriber {
    pub fn with_type(mut self, id: &str, volume_type: &str) -> Self {
        self.types.insert(id.to_string(), volume_type.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VolumeDescriber for FakeDescriber {
    async fn describe_volumes(&self, volume_ids: &[String]) -> Result<Vec<VolumeDescriptor>> {
        self.calls.lock().unwrap().push(volume_ids.to_vec());
        if volume_ids.iter().any(|id| self.poison_ids.contains(id)) {
            return Err(Error::CloudProvider {
                operation: "DescribeVolumes".into(),
                reason: "InvalidVolume.NotFound".into(),
            });
        }
        Ok(volume_ids
            .iter()
            .filter_map(|id| {
                self.types.get(id).map(|t| VolumeDescriptor {
                    volume_id: Some(id.clone()),
                    volume_type: Some(t.clone()),
                })
            })
            .collect())
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

// =============================================================================
// Record Builders
// =============================================================================

pub(crate) fn volume(name: &str, csi_handle: Option<&str>) -> VolumeRecord {
    VolumeRecord {
        name: name.to_string(),
        csi_volume_handle: csi_handle.map(str::to_string),
        storage_class: Some("gp3".into()),
        reclaim_policy: Some("Delete".into()),
        ..Default::default()
    }
}

pub(crate) fn claim(namespace: &str, name: &str, volume_name: Option<&str>) -> ClaimRecord {
    ClaimRecord {
        namespace: namespace.to_string(),
        name: name.to_string(),
        requested_storage: Some("10Gi".into()),
        volume_name: volume_name.map(str::to_string),
        access_modes: vec!["ReadWriteOnce".into()],
        phase: Some(if volume_name.is_some() { "Bound" } else { "Pending" }.into()),
        created_at: Some(chrono::Utc::now() - chrono::Duration::hours(25)),
        ..Default::default()
    }
}

pub(crate) fn node(name: &str, instance_id: &str) -> NodeRecord {
    NodeRecord {
        name: name.to_string(),
        provider_id: Some(format!("aws:///eu-west-1a/{}", instance_id)),
    }
}

pub(crate) fn pod(namespace: &str, node_name: Option<&str>, claims: &[&str]) -> PodAttachment {
    PodAttachment {
        namespace: namespace.to_string(),
        node_name: node_name.map(str::to_string),
        claim_names: claims.iter().map(|c| c.to_string()).collect(),
    }
}

/// Render a kubelet document with the given `(family, namespace, claim, value)` gauges
pub(crate) fn kubelet_doc(samples: &[(&str, &str, &str, f64)]) -> String {
    let mut families: Vec<&str> = Vec::new();
    for (family, ..) in samples {
        if !families.contains(family) {
            families.push(*family);
        }
    }

    let mut doc = String::new();
    for family in families {
        doc.push_str(&format!("# TYPE {} gauge\n", family));
        for (_, ns, pvc, value) in samples.iter().filter(|s| s.0 == family) {
            doc.push_str(&format!(
                "{}{{namespace=\"{}\",persistentvolumeclaim=\"{}\"}} {}\n",
                family, ns, pvc, value
            ));
        }
    }
    doc
}
