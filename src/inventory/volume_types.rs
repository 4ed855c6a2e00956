//! Batched volume type lookup
//!
//! Canonical volume ids are described in fixed-size batches. A batch that
//! fails leaves its ids untyped; the remaining batches still run.

use crate::domain::VolumeDescriber;
use crate::inventory::outcome::{cancellable, BatchReport, SourceOutcome};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Volume id to provider volume type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeTypeMap {
    by_id: HashMap<String, String>,
}

impl VolumeTypeMap {
    pub fn get(&self, volume_id: &str) -> Option<&str> {
        if volume_id.is_empty() {
            return None;
        }
        self.by_id.get(volume_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Result of the lookup across all batches
#[derive(Debug, Clone)]
pub struct VolumeTypeLookup {
    pub types: VolumeTypeMap,
    pub outcome: SourceOutcome,
    pub batches: Vec<BatchReport>,
}

impl VolumeTypeLookup {
    fn skipped(reason: &str) -> Self {
        Self {
            types: VolumeTypeMap::default(),
            outcome: SourceOutcome::skipped(reason),
            batches: Vec::new(),
        }
    }
}

/// Describe `volume_ids` in batches of `batch_size`
pub async fn fetch_volume_types(
    describer: Option<&dyn VolumeDescriber>,
    volume_ids: &[String],
    batch_size: usize,
    concurrency: usize,
    cancel: &CancellationToken,
) -> VolumeTypeLookup {
    let Some(describer) = describer else {
        debug!("No cloud provider configured; volume types not resolved");
        return VolumeTypeLookup::skipped("no cloud provider");
    };
    if volume_ids.is_empty() {
        return VolumeTypeLookup::skipped("no volume ids");
    }

    let responses: Vec<_> = stream::iter(volume_ids.chunks(batch_size.max(1)).enumerate())
        .map(|(index, batch)| async move {
            let operation = format!("{} describe batch {}", describer.provider_name(), index);
            let result = cancellable(cancel, &operation, describer.describe_volumes(batch)).await;
            (index, batch.len(), result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut by_id = HashMap::new();
    let mut batches = Vec::with_capacity(responses.len());

    for (index, size, result) in responses {
        match result {
            Ok(descriptors) => {
                let mut resolved = 0;
                for descriptor in descriptors {
                    let (Some(id), Some(volume_type)) = (descriptor.volume_id, descriptor.volume_type) else {
                        continue;
                    };
                    if id.is_empty() || volume_type.is_empty() {
                        continue;
                    }
                    by_id.insert(id, volume_type);
                    resolved += 1;
                }
                batches.push(BatchReport {
                    index,
                    size,
                    resolved,
                    outcome: SourceOutcome::Success,
                });
            }
            Err(e) => {
                warn!("Volume type batch {} ({} ids) failed: {}", index, size, e);
                batches.push(BatchReport {
                    index,
                    size,
                    resolved: 0,
                    outcome: SourceOutcome::failed(e),
                });
            }
        }
    }

    let failed = batches.iter().filter(|b| b.outcome.is_failed()).count();
    let outcome = if failed == 0 {
        SourceOutcome::Success
    } else {
        SourceOutcome::failed(format!("{} of {} batches failed", failed, batches.len()))
    };

    VolumeTypeLookup {
        types: VolumeTypeMap { by_id },
        outcome,
        batches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VolumeDescriptor;
    use crate::error::Result;
    use crate::inventory::fixtures::FakeDescriber;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("vol-{:08x}", i)).collect()
    }

    #[tokio::test]
    async fn test_no_provider_is_noop() {
        let cancel = CancellationToken::new();
        let lookup = fetch_volume_types(None, &ids(3), 200, 1, &cancel).await;
        assert!(lookup.types.is_empty());
        assert_matches!(lookup.outcome, SourceOutcome::Skipped { .. });
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let describer = FakeDescriber::default();
        let cancel = CancellationToken::new();
        let lookup = fetch_volume_types(Some(&describer), &[], 200, 1, &cancel).await;
        assert!(lookup.types.is_empty());
        assert_eq!(describer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batches_of_two_hundred() {
        let all = ids(450);
        let mut describer = FakeDescriber::default();
        for id in &all {
            describer.types.insert(id.clone(), "gp3".into());
        }
        let cancel = CancellationToken::new();

        let lookup = fetch_volume_types(Some(&describer), &all, 200, 2, &cancel).await;

        let sizes: Vec<usize> = describer.calls.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes.iter().sum::<usize>(), 450);
        assert!(sizes.iter().all(|&s| s <= 200));
        assert_eq!(lookup.types.len(), 450);
        assert_eq!(lookup.outcome, SourceOutcome::Success);
        assert_eq!(
            lookup.batches.iter().map(|b| b.size).collect::<Vec<_>>(),
            vec![200, 200, 50]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped() {
        let all = ids(5);
        let mut describer = FakeDescriber::default()
            .with_type(&all[0], "gp2")
            .with_type(&all[1], "gp2")
            .with_type(&all[4], "io2");
        describer.poison_ids.insert(all[2].clone());
        let cancel = CancellationToken::new();

        let lookup = fetch_volume_types(Some(&describer), &all, 2, 1, &cancel).await;

        assert_eq!(describer.call_count(), 3);
        assert_eq!(lookup.types.get(&all[0]), Some("gp2"));
        assert_eq!(lookup.types.get(&all[2]), None);
        assert_eq!(lookup.types.get(&all[4]), Some("io2"));
        assert!(lookup.batches[1].outcome.is_failed());
        assert_eq!(lookup.batches[2].resolved, 1);
        assert_matches!(lookup.outcome, SourceOutcome::Failed { reason } if reason == "1 of 3 batches failed");
    }

    struct SloppyDescriber;

    #[async_trait]
    impl VolumeDescriber for SloppyDescriber {
        async fn describe_volumes(&self, _ids: &[String]) -> Result<Vec<VolumeDescriptor>> {
            Ok(vec![
                VolumeDescriptor {
                    volume_id: Some("vol-01".into()),
                    volume_type: Some(String::new()),
                },
                VolumeDescriptor {
                    volume_id: None,
                    volume_type: Some("gp3".into()),
                },
                VolumeDescriptor {
                    volume_id: Some("vol-02".into()),
                    volume_type: Some("st1".into()),
                },
            ])
        }

        fn provider_name(&self) -> &str {
            "sloppy"
        }
    }

    #[tokio::test]
    async fn test_incomplete_descriptors_ignored() {
        let cancel = CancellationToken::new();
        let lookup = fetch_volume_types(
            Some(&SloppyDescriber),
            &["vol-01".to_string(), "vol-02".to_string()],
            200,
            1,
            &cancel,
        )
        .await;

        assert_eq!(lookup.types.len(), 1);
        assert_eq!(lookup.types.get("vol-02"), Some("st1"));
        assert_eq!(lookup.types.get(""), None);
    }
}
