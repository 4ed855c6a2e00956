//! Report rows

use serde::Serialize;
use tabled::Tabled;

/// Shown for any field that could not be resolved
pub const PLACEHOLDER: &str = "-";

/// Shown in the PV column of an unbound claim
pub const UNBOUND: &str = "(none)";

/// One fully resolved claim
///
/// Field order is the table's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct ReportRow {
    #[tabled(rename = "NAMESPACE")]
    pub namespace: String,
    #[tabled(rename = "PVC")]
    pub pvc: String,
    #[tabled(rename = "PV")]
    pub pv: String,
    #[tabled(rename = "CAP")]
    pub capacity: String,
    #[tabled(rename = "SC")]
    pub storage_class: String,
    #[tabled(rename = "VOLUME_ID")]
    pub volume_id: String,
    #[tabled(rename = "VTYPE")]
    pub volume_type: String,
    /// Comma-joined instance ids
    #[tabled(rename = "NODE_ID")]
    pub node_ids: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "CAP%")]
    pub capacity_used_percent: String,
    #[tabled(rename = "IND%")]
    pub inodes_used_percent: String,
    #[tabled(rename = "AM")]
    pub access_modes: String,
    #[tabled(rename = "RC")]
    pub reclaim_policy: String,
    #[tabled(rename = "AGE")]
    pub age: String,
}

impl ReportRow {
    /// Same row without the time-dependent AGE column
    pub fn without_age(&self) -> ReportRow {
        ReportRow {
            age: String::new(),
            ..self.clone()
        }
    }
}

/// The value, or the placeholder when empty
pub(crate) fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_and_fields_follow_column_order() {
        let row = ReportRow {
            namespace: "ns".into(),
            pvc: "pvc".into(),
            pv: "pv".into(),
            capacity: "cap".into(),
            storage_class: "sc".into(),
            volume_id: "vid".into(),
            volume_type: "vt".into(),
            node_ids: "nid".into(),
            status: "st".into(),
            capacity_used_percent: "c%".into(),
            inodes_used_percent: "i%".into(),
            access_modes: "am".into(),
            reclaim_policy: "rc".into(),
            age: "age".into(),
        };
        assert_eq!(
            ReportRow::headers(),
            [
                "NAMESPACE", "PVC", "PV", "CAP", "SC", "VOLUME_ID", "VTYPE", "NODE_ID", "STATUS",
                "CAP%", "IND%", "AM", "RC", "AGE",
            ]
        );
        assert_eq!(
            row.fields(),
            ["ns", "pvc", "pv", "cap", "sc", "vid", "vt", "nid", "st", "c%", "i%", "am", "rc", "age"]
        );
        assert_eq!(row.without_age().age, "");
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(or_placeholder(Some("gp3")), "gp3");
        assert_eq!(or_placeholder(Some("")), "-");
        assert_eq!(or_placeholder(None), "-");
    }
}
