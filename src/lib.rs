//! Volume Inventory - PVC / PV / EBS correlation
//!
//! Builds a single report joining every PersistentVolumeClaim with its bound
//! PersistentVolume, the EBS volume behind it, the EC2 instances mounting it
//! and the kubelet's live usage statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                              Inventory Pass                                  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │  PV / PVC /     │  │  Kubelet        │  │  Volume Type                │  │
//! │  │  Node / Pod     │  │  Volume Stats   │  │  Batch Lookup               │  │
//! │  │  Listing        │  │  (per node)     │  │  (200 ids per call)         │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           │                    │                         │                   │
//! │           └────────────────────┼─────────────────────────┘                   │
//! │                                │                                             │
//! │                    ┌───────────┴───────────┐                                │
//! │                    │    Row Correlator     │                                │
//! │                    │  (one row per claim)  │                                │
//! │                    └───────────────────────┘                                │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                               Adapters                                       │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │      Kubernetes API         │  │           AWS EC2                   │   │
//! │  │   (kube + k8s-openapi)      │  │   (DescribeVolumes)                 │   │
//! │  └─────────────────────────────┘  └─────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`inventory`]: Correlation engine and pass orchestration
//! - [`cluster`]: Kubernetes cluster reader
//! - [`cloud`]: Cloud provider volume describers
//! - [`render`]: Table, JSON and YAML output
//! - [`config`]: Pass configuration
//! - [`domain`]: Core records and port traits
//! - [`error`]: Error types and handling

pub mod cloud;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod render;

// Re-export commonly used types
pub use cluster::{build_client, KubeClientOptions, KubeClusterReader};

#[cfg(feature = "ec2")]
pub use cloud::Ec2VolumeDescriber;

pub use config::InventoryConfig;

pub use domain::ports::{
    AccessMode, ClaimRecord, ClusterReader, ClusterReaderRef, NodeRecord, PodAttachment,
    VolumeDescriber, VolumeDescriberRef, VolumeDescriptor, VolumeRecord,
};

pub use error::{Error, Result};

pub use inventory::{
    run_pass, CorrelationContext, Inventory, PassDiagnostics, ReportRow, SourceOutcome,
};

pub use render::{render, OutputFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
