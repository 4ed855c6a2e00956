//! Row correlation
//!
//! Joins each claim with its bound volume, the nodes mounting it, its usage
//! aggregate and its volume type. Every field resolves on its own, so a
//! missing source only blanks the columns that depend on it.

use crate::domain::{AccessMode, ClaimRecord};
use crate::inventory::identifier::extract_volume_id;
use crate::inventory::metrics::UsageIndex;
use crate::inventory::report::{or_placeholder, ReportRow, PLACEHOLDER, UNBOUND};
use crate::inventory::topology::Topology;
use crate::inventory::volume_types::VolumeTypeMap;
use chrono::{DateTime, Duration, Utc};

// =============================================================================
// Correlator
// =============================================================================

/// Joins claims against the indexes of one pass
pub struct Correlator<'a> {
    topology: &'a Topology,
    usage: &'a UsageIndex,
    types: &'a VolumeTypeMap,
    now: DateTime<Utc>,
}

impl<'a> Correlator<'a> {
    pub fn new(
        topology: &'a Topology,
        usage: &'a UsageIndex,
        types: &'a VolumeTypeMap,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            topology,
            usage,
            types,
            now,
        }
    }

    /// One row per claim, in claim order
    pub fn rows(&self, claims: &[ClaimRecord]) -> Vec<ReportRow> {
        claims.iter().map(|claim| self.row(claim)).collect()
    }

    pub fn row(&self, claim: &ClaimRecord) -> ReportRow {
        let key = claim.key();
        let volume = claim
            .volume_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| self.topology.volumes.get(name));

        let storage_class = claim
            .storage_class
            .as_deref()
            .filter(|sc| !sc.is_empty())
            .or_else(|| volume.and_then(|v| v.storage_class.as_deref()));

        let volume_id = volume.map(extract_volume_id).unwrap_or_default();
        let volume_type = self.types.get(&volume_id);

        let instance_ids = self.topology.instance_ids(&key);
        let node_ids = if instance_ids.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            instance_ids.join(",")
        };

        let usage = self.usage.get(&key);

        ReportRow {
            namespace: claim.namespace.clone(),
            pvc: claim.name.clone(),
            pv: volume.map_or_else(|| UNBOUND.to_string(), |v| v.name.clone()),
            capacity: or_placeholder(claim.requested_storage.as_deref()),
            storage_class: or_placeholder(storage_class),
            volume_id: or_placeholder(Some(volume_id.as_str())),
            volume_type: or_placeholder(volume_type),
            node_ids,
            status: or_placeholder(claim.phase.as_deref()),
            capacity_used_percent: format_percent(usage.and_then(|u| u.used_percent())),
            inodes_used_percent: format_percent(usage.and_then(|u| u.inodes_used_percent())),
            access_modes: access_modes_short(&claim.access_modes),
            reclaim_policy: or_placeholder(volume.and_then(|v| v.reclaim_policy.as_deref())),
            age: claim
                .created_at
                .map_or_else(|| PLACEHOLDER.to_string(), |created| humanize_age(self.now - created)),
        }
    }
}

// =============================================================================
// Field Formatting
// =============================================================================

/// Percentage with one decimal, or the placeholder
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(pct) => format!("{:.1}", pct),
        None => PLACEHOLDER.to_string(),
    }
}

/// Comma-joined short access modes (RWO, ROX, RWX, RWOP)
pub fn access_modes_short(modes: &[String]) -> String {
    if modes.is_empty() {
        return PLACEHOLDER.to_string();
    }
    modes
        .iter()
        .map(|m| AccessMode::from(m.as_str()).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Compact age: `45s`, `7m`, `3h`, `3h12m`, `2d`, `2d5h`
///
/// Negative durations (clock skew) count as zero.
pub fn humanize_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 60 {
        return format!("{}s", secs);
    }

    let days = secs / 86_400;
    let hours = (secs / 3_600) % 24;
    let mins = (secs / 60) % 60;

    match (days, hours, mins) {
        (d, h, _) if d > 0 && h > 0 => format!("{}d{}h", d, h),
        (d, _, _) if d > 0 => format!("{}d", d),
        (_, h, m) if h > 0 && m > 0 => format!("{}h{}m", h, m),
        (_, h, _) if h > 0 => format!("{}h", h),
        (_, _, m) => format!("{}m", m),
    }
}
