//! Kubernetes API adapter
//!
//! Implements [`ClusterReader`] with a `kube` client. Objects are flattened
//! into domain records right after listing so the engine never sees
//! `k8s-openapi` types.

use crate::domain::{ClaimRecord, ClusterReader, NodeRecord, PodAttachment, VolumeRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolume, PersistentVolumeClaim, Pod};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Client Setup
// =============================================================================

/// How to reach the API server
#[derive(Debug, Clone)]
pub struct KubeClientOptions {
    /// Explicit kubeconfig file; otherwise in-cluster or `$KUBECONFIG`
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
    /// Per-request read timeout
    pub read_timeout: Duration,
}

impl Default for KubeClientOptions {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Build a client from the options
pub async fn build_client(options: &KubeClientOptions) -> Result<Client> {
    let kube_opts = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let mut config = match (&options.kubeconfig, &options.context) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::KubeConfig(format!("cannot read {}: {}", path.display(), e))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &kube_opts)
                .await
                .map_err(|e| Error::KubeConfig(e.to_string()))?
        }
        (None, Some(_)) => Config::from_kubeconfig(&kube_opts)
            .await
            .map_err(|e| Error::KubeConfig(e.to_string()))?,
        (None, None) => Config::infer()
            .await
            .map_err(|e| Error::KubeConfig(e.to_string()))?,
    };
    config.read_timeout = Some(options.read_timeout);

    debug!("Kubernetes API server: {}", config.cluster_url);
    Ok(Client::try_from(config)?)
}

// =============================================================================
// Cluster Reader
// =============================================================================

/// [`ClusterReader`] backed by the Kubernetes API
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(volume_record).collect())
    }

    async fn list_claims(&self, namespace: Option<&str>) -> Result<Vec<ClaimRecord>> {
        let api: Api<PersistentVolumeClaim> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(claim_record).collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(node_record).collect())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodAttachment>> {
        let api: Api<Pod> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(pod_attachment).collect())
    }

    async fn get_raw(&self, path: &str) -> Result<String> {
        let request = http::Request::get(path)
            .body(Vec::new())
            .map_err(|e| Error::RawFetch {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        self.client
            .request_text(request)
            .await
            .map_err(|e| Error::RawFetch {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// Record Conversion
// =============================================================================

pub fn volume_record(pv: &PersistentVolume) -> VolumeRecord {
    let spec = pv.spec.as_ref();
    VolumeRecord {
        name: pv.name_any(),
        csi_volume_handle: spec
            .and_then(|s| s.csi.as_ref())
            .map(|csi| csi.volume_handle.clone()),
        ebs_volume_id: spec
            .and_then(|s| s.aws_elastic_block_store.as_ref())
            .map(|ebs| ebs.volume_id.clone()),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()),
        reclaim_policy: spec.and_then(|s| s.persistent_volume_reclaim_policy.clone()),
    }
}

pub fn claim_record(pvc: &PersistentVolumeClaim) -> ClaimRecord {
    let spec = pvc.spec.as_ref();
    ClaimRecord {
        namespace: pvc.namespace().unwrap_or_default(),
        name: pvc.name_any(),
        requested_storage: spec
            .and_then(|s| s.resources.as_ref())
            .and_then(|r| r.requests.as_ref())
            .and_then(|requests| requests.get("storage"))
            .map(|quantity| quantity.0.clone()),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()),
        volume_name: spec.and_then(|s| s.volume_name.clone()),
        access_modes: spec
            .and_then(|s| s.access_modes.clone())
            .unwrap_or_default(),
        phase: pvc.status.as_ref().and_then(|s| s.phase.clone()),
        created_at: pvc.metadata.creation_timestamp.as_ref().map(|t| t.0),
    }
}

pub fn node_record(node: &Node) -> NodeRecord {
    NodeRecord {
        name: node.name_any(),
        provider_id: node.spec.as_ref().and_then(|s| s.provider_id.clone()),
    }
}

/// Claims mounted by a pod, and where it runs
pub fn pod_attachment(pod: &Pod) -> PodAttachment {
    let spec = pod.spec.as_ref();
    PodAttachment {
        namespace: pod.namespace().unwrap_or_default(),
        node_name: spec.and_then(|s| s.node_name.clone()),
        claim_names: spec
            .and_then(|s| s.volumes.as_ref())
            .map(|volumes| {
                volumes
                    .iter()
                    .filter_map(|v| v.persistent_volume_claim.as_ref())
                    .map(|source| source.claim_name.clone())
                    .collect()
            })
            .unwrap_or_default(),
    }
}
