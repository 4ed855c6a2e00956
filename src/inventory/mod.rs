//! Inventory Module
//!
//! The correlation engine: identifier normalization, kubelet metric parsing
//! and aggregation, topology indexes, batched volume type lookup and the row
//! correlator, tied together by [`run_pass`].

pub mod correlate;
pub mod exposition;
pub mod identifier;
pub mod metrics;
pub mod outcome;
pub mod pass;
pub mod report;
pub mod topology;
pub mod volume_types;

#[cfg(test)]
mod fixtures;

pub use correlate::{access_modes_short, format_percent, humanize_age, Correlator};
pub use exposition::{Exposition, MetricFamily, MetricKind, Sample, SampleValue};
pub use identifier::{extract_volume_id, instance_id_from_provider_id, normalize_volume_id};
pub use metrics::{collect_usage, scrape_node, UsageAggregate, UsageIndex};
pub use outcome::{BatchReport, NodeScrapeReport, PassDiagnostics, ScrapeSource, SourceOutcome};
pub use pass::{run_pass, CorrelationContext, Inventory};
pub use report::{ReportRow, PLACEHOLDER, UNBOUND};
pub use topology::{AttachmentIndex, InstanceIndex, Topology, VolumeIndex};
pub use volume_types::{fetch_volume_types, VolumeTypeLookup, VolumeTypeMap};
