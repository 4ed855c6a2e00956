//! Cloud identifier normalization
//!
//! EBS volume ids show up bare (`vol-0abc`), wrapped in legacy in-tree URLs
//! (`aws://eu-west-1a/vol-0abc`) or inside CSI volume handles. Node instance
//! ids come from the node's provider id (`aws:///eu-west-1a/i-0abc`).

use crate::domain::VolumeRecord;
use regex::Regex;
use std::sync::OnceLock;

const VOLUME_ID_PATTERN: &str = "vol-[0-9a-fA-F]+";

fn volume_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VOLUME_ID_PATTERN).expect("volume id pattern is valid"))
}

/// Extract the `vol-<hex>` substring from `raw`, or return `raw` unchanged
pub fn normalize_volume_id(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match volume_id_regex().find(raw) {
        Some(m) => m.as_str().to_string(),
        None => raw.to_string(),
    }
}

/// Canonical volume id of a PersistentVolume, or an empty string
///
/// The CSI handle wins over the in-tree EBS source when both are set.
pub fn extract_volume_id(volume: &VolumeRecord) -> String {
    if let Some(handle) = volume.csi_volume_handle.as_deref().filter(|h| !h.is_empty()) {
        return normalize_volume_id(handle);
    }
    if let Some(id) = volume.ebs_volume_id.as_deref().filter(|id| !id.is_empty()) {
        return normalize_volume_id(id);
    }
    String::new()
}

/// Last `/` segment of a provider id
pub fn instance_id_from_provider_id(provider_id: &str) -> String {
    if provider_id.is_empty() {
        return String::new();
    }
    provider_id
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_id() {
        assert_eq!(normalize_volume_id("vol-0123abcdEF"), "vol-0123abcdEF");
    }

    #[test]
    fn test_normalize_embedded_id() {
        assert_eq!(
            normalize_volume_id("aws://eu-west-1a/vol-0a1b2c3d4e5f"),
            "vol-0a1b2c3d4e5f"
        );
        assert_eq!(
            normalize_volume_id("zone=us-east-1b,type=gp3,vol-deadbeef"),
            "vol-deadbeef"
        );
    }

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(normalize_volume_id("pvc-1234-efs"), "pvc-1234-efs");
        assert_eq!(normalize_volume_id("vol-xyz"), "vol-xyz");
        assert_eq!(normalize_volume_id(""), "");
    }

    #[test]
    fn test_extract_prefers_csi_handle() {
        let volume = VolumeRecord {
            name: "pv-1".into(),
            csi_volume_handle: Some("vol-0aaa".into()),
            ebs_volume_id: Some("vol-0bbb".into()),
            ..Default::default()
        };
        assert_eq!(extract_volume_id(&volume), "vol-0aaa");
    }

    #[test]
    fn test_extract_falls_back_to_ebs() {
        let volume = VolumeRecord {
            name: "pv-1".into(),
            csi_volume_handle: Some(String::new()),
            ebs_volume_id: Some("aws://us-east-1a/vol-0bbb".into()),
            ..Default::default()
        };
        assert_eq!(extract_volume_id(&volume), "vol-0bbb");

        let bare = VolumeRecord {
            name: "pv-2".into(),
            ..Default::default()
        };
        assert_eq!(extract_volume_id(&bare), "");
    }

    #[test]
    fn test_instance_id_from_provider_id() {
        assert_eq!(
            instance_id_from_provider_id("aws:///eu-west-1a/i-0123456789abcdef0"),
            "i-0123456789abcdef0"
        );
        assert_eq!(instance_id_from_provider_id("kind://docker/kind/kind-worker"), "kind-worker");
        assert_eq!(instance_id_from_provider_id("no-slashes"), "no-slashes");
        assert_eq!(instance_id_from_provider_id("aws:///zone/"), "");
        assert_eq!(instance_id_from_provider_id(""), "");
    }
}
