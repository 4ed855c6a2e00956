//! Topology indexes
//!
//! Three lookups built once per pass: volumes by name (plus the list of
//! distinct cloud volume ids), node name to instance id, and claim key to
//! the set of nodes with a pod mounting that claim.

use crate::domain::{claim_key, NodeRecord, PodAttachment, VolumeRecord};
use crate::inventory::identifier::{extract_volume_id, instance_id_from_provider_id};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

// =============================================================================
// Volume Index
// =============================================================================

/// PersistentVolumes by name
#[derive(Debug, Clone, Default)]
pub struct VolumeIndex {
    by_name: HashMap<String, VolumeRecord>,
    volume_ids: IndexSet<String>,
}

impl VolumeIndex {
    pub fn build(volumes: Vec<VolumeRecord>) -> Self {
        let mut index = Self {
            by_name: HashMap::with_capacity(volumes.len()),
            volume_ids: IndexSet::with_capacity(volumes.len()),
        };

        for volume in volumes {
            let id = extract_volume_id(&volume);
            if !id.is_empty() {
                index.volume_ids.insert(id);
            }
            index.by_name.insert(volume.name.clone(), volume);
        }

        index
    }

    pub fn get(&self, name: &str) -> Option<&VolumeRecord> {
        self.by_name.get(name)
    }

    /// Distinct canonical volume ids, in first-seen order
    pub fn volume_ids(&self) -> Vec<String> {
        self.volume_ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// =============================================================================
// Instance Index
// =============================================================================

/// Node name to cloud instance id
#[derive(Debug, Clone, Default)]
pub struct InstanceIndex {
    by_node: HashMap<String, String>,
}

impl InstanceIndex {
    /// Every node gets an entry, even when its provider id yields nothing
    pub fn build(nodes: &[NodeRecord]) -> Self {
        let by_node = nodes
            .iter()
            .map(|node| {
                let instance = instance_id_from_provider_id(node.provider_id.as_deref().unwrap_or_default());
                (node.name.clone(), instance)
            })
            .collect();
        Self { by_node }
    }

    /// Instance id of a node; `None` for unknown nodes and empty ids
    pub fn instance_id(&self, node: &str) -> Option<&str> {
        self.by_node
            .get(node)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

// =============================================================================
// Attachment Index
// =============================================================================

/// Claim key to the nodes running pods that mount the claim
#[derive(Debug, Clone, Default)]
pub struct AttachmentIndex {
    by_claim: IndexMap<String, IndexSet<String>>,
}

impl AttachmentIndex {
    /// Unscheduled pods are ignored
    pub fn build(pods: &[PodAttachment]) -> Self {
        let mut by_claim: IndexMap<String, IndexSet<String>> = IndexMap::new();

        for pod in pods {
            let Some(node) = pod.node_name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            for claim in &pod.claim_names {
                by_claim
                    .entry(claim_key(&pod.namespace, claim))
                    .or_default()
                    .insert(node.to_string());
            }
        }

        Self { by_claim }
    }

    /// Nodes for a claim key, in first-seen order
    pub fn nodes(&self, key: &str) -> impl Iterator<Item = &str> {
        self.by_claim
            .get(key)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.by_claim.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_claim.is_empty()
    }
}

// =============================================================================
// Topology
// =============================================================================

/// All three indexes of a pass
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub volumes: VolumeIndex,
    pub instances: InstanceIndex,
    pub attachments: AttachmentIndex,
}

impl Topology {
    pub fn build(volumes: Vec<VolumeRecord>, nodes: &[NodeRecord], pods: &[PodAttachment]) -> Self {
        Self {
            volumes: VolumeIndex::build(volumes),
            instances: InstanceIndex::build(nodes),
            attachments: AttachmentIndex::build(pods),
        }
    }

    /// Instance ids of the nodes mounting a claim, unknown ones dropped
    pub fn instance_ids(&self, key: &str) -> Vec<&str> {
        self.attachments
            .nodes(key)
            .filter_map(|node| self.instances.instance_id(node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::fixtures::{node, pod, volume};

    #[test]
    fn test_volume_ids_deduplicated_in_order() {
        let mut legacy = volume("pv-legacy", None);
        legacy.ebs_volume_id = Some("aws://eu-west-1a/vol-0bbb".into());

        let index = VolumeIndex::build(vec![
            volume("pv-b", Some("vol-0bbb")),
            volume("pv-a", Some("vol-0aaa")),
            legacy,
            volume("pv-nfs", None),
            volume("pv-efs", Some("fs-1234::fsap-5678")),
        ]);

        assert_eq!(index.len(), 5);
        assert_eq!(
            index.volume_ids(),
            vec!["vol-0bbb".to_string(), "vol-0aaa".into(), "fs-1234::fsap-5678".into()]
        );
        assert!(index.get("pv-nfs").is_some());
        assert!(index.get("missing").is_none());
    }

    #[test]
    fn test_instance_index_keeps_unknown_nodes() {
        let mut bare = node("bare", "");
        bare.provider_id = None;
        let index = InstanceIndex::build(&[node("n1", "i-0abc"), bare]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.instance_id("n1"), Some("i-0abc"));
        assert_eq!(index.instance_id("bare"), None);
        assert_eq!(index.instance_id("ghost"), None);
    }

    #[test]
    fn test_attachment_set_semantics() {
        let index = AttachmentIndex::build(&[
            pod("db", Some("n1"), &["data"]),
            pod("db", Some("n2"), &["data", "logs"]),
            pod("db", Some("n1"), &["data"]),
            pod("db", None, &["data"]),
            pod("db", Some(""), &["data"]),
            pod("web", Some("n3"), &["data"]),
        ]);

        assert_eq!(index.nodes("db/data").collect::<Vec<_>>(), vec!["n1", "n2"]);
        assert_eq!(index.nodes("db/logs").collect::<Vec<_>>(), vec!["n2"]);
        assert_eq!(index.nodes("web/data").collect::<Vec<_>>(), vec!["n3"]);
        assert_eq!(index.nodes("db/none").count(), 0);
    }

    #[test]
    fn test_topology_instance_ids_drop_unknown() {
        let mut blank = node("n2", "");
        blank.provider_id = Some(String::new());
        let topology = Topology::build(
            Vec::new(),
            &[node("n1", "i-1"), blank],
            &[
                pod("db", Some("n1"), &["data"]),
                pod("db", Some("n2"), &["data"]),
                pod("db", Some("n9"), &["data"]),
            ],
        );

        assert_eq!(topology.instance_ids("db/data"), vec!["i-1"]);
    }
}
