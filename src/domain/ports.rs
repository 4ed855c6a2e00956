//! Domain Ports - Core trait definitions for the volume inventory
//!
//! These traits define the boundaries between the correlation engine and the
//! two external read APIs: the Kubernetes cluster and the cloud provider.
//! Adapters implement these traits to provide concrete functionality; tests
//! implement them in memory.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Cluster Records
// =============================================================================

/// A PersistentVolume as seen by the inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Volume name
    pub name: String,
    /// CSI volume handle, if the volume is CSI-provisioned
    pub csi_volume_handle: Option<String>,
    /// In-tree `awsElasticBlockStore.volumeID`, if present
    pub ebs_volume_id: Option<String>,
    /// Storage class name
    pub storage_class: Option<String>,
    /// Reclaim policy (Retain, Delete, Recycle)
    pub reclaim_policy: Option<String>,
}

/// A PersistentVolumeClaim as seen by the inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub namespace: String,
    pub name: String,
    /// Requested storage quantity, as written in the claim (e.g. `10Gi`)
    pub requested_storage: Option<String>,
    /// Storage class set on the claim itself
    pub storage_class: Option<String>,
    /// Name of the bound PersistentVolume
    pub volume_name: Option<String>,
    /// Raw access mode names (ReadWriteOnce, ...)
    pub access_modes: Vec<String>,
    /// Claim phase (Pending, Bound, Lost)
    pub phase: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClaimRecord {
    /// Key shared by the usage aggregate and the topology index
    pub fn key(&self) -> String {
        claim_key(&self.namespace, &self.name)
    }
}

/// A Node reduced to what the inventory needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    /// Cloud provider id, e.g. `aws:///eu-west-1a/i-0123456789abcdef0`
    pub provider_id: Option<String>,
}

/// A scheduled pod's claim references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAttachment {
    pub namespace: String,
    /// Node the pod is assigned to; `None` while unscheduled
    pub node_name: Option<String>,
    /// Claim names referenced by the pod's PVC volumes
    pub claim_names: Vec<String>,
}

/// Build the `namespace/claim` key
pub fn claim_key(namespace: &str, claim: &str) -> String {
    format!("{}/{}", namespace, claim)
}

// =============================================================================
// Access Modes
// =============================================================================

/// Volume access mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
    ReadWriteOncePod,
    Other(String),
}

impl From<&str> for AccessMode {
    fn from(s: &str) -> Self {
        match s {
            "ReadWriteOnce" => AccessMode::ReadWriteOnce,
            "ReadOnlyMany" => AccessMode::ReadOnlyMany,
            "ReadWriteMany" => AccessMode::ReadWriteMany,
            "ReadWriteOncePod" => AccessMode::ReadWriteOncePod,
            other => AccessMode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadWriteOnce => write!(f, "RWO"),
            AccessMode::ReadOnlyMany => write!(f, "ROX"),
            AccessMode::ReadWriteMany => write!(f, "RWX"),
            AccessMode::ReadWriteOncePod => write!(f, "RWOP"),
            AccessMode::Other(raw) => write!(f, "{}", raw),
        }
    }
}

// =============================================================================
// Cluster Reader Port
// =============================================================================

/// Port for read-only cluster access
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// List all PersistentVolumes
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>>;

    /// List PersistentVolumeClaims, in one namespace or across all
    async fn list_claims(&self, namespace: Option<&str>) -> Result<Vec<ClaimRecord>>;

    /// List all Nodes
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;

    /// List Pods, in one namespace or across all
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodAttachment>>;

    /// Fetch a raw text document from an API server path
    async fn get_raw(&self, path: &str) -> Result<String>;
}

// =============================================================================
// Volume Describer Port
// =============================================================================

/// Volume metadata returned by the cloud provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDescriptor {
    pub volume_id: Option<String>,
    /// Provider volume type (gp2, gp3, io2, ...)
    pub volume_type: Option<String>,
}

/// Port for cloud block-volume metadata lookups
#[async_trait]
pub trait VolumeDescriber: Send + Sync {
    /// Describe a batch of volumes by canonical id
    async fn describe_volumes(&self, volume_ids: &[String]) -> Result<Vec<VolumeDescriptor>>;

    /// Provider name, for logs
    fn provider_name(&self) -> &str;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterReaderRef = Arc<dyn ClusterReader>;
pub type VolumeDescriberRef = Arc<dyn VolumeDescriber>;
