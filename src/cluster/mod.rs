//! Cluster Module
//!
//! Kubernetes-backed implementation of the cluster read port.

pub mod kubernetes;

pub use kubernetes::{build_client, KubeClientOptions, KubeClusterReader};
