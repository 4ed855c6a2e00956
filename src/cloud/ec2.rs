//! AWS EC2 volume describer
//!
//! Resolves EBS volume types with `DescribeVolumes`. Credentials and region
//! come from the standard AWS chain (environment, shared config, IRSA, IMDS).

use crate::domain::{VolumeDescriber, VolumeDescriptor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Volume;
use tracing::debug;

/// [`VolumeDescriber`] backed by EC2
pub struct Ec2VolumeDescriber {
    client: aws_sdk_ec2::Client,
}

impl Ec2VolumeDescriber {
    /// Load the default AWS configuration, optionally pinning the region
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        match sdk_config.region() {
            Some(region) => debug!("EC2 describer using region {}", region),
            None => debug!("EC2 describer has no region configured"),
        }

        Self {
            client: aws_sdk_ec2::Client::new(&sdk_config),
        }
    }

    pub fn with_client(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

fn descriptor(volume: &Volume) -> VolumeDescriptor {
    VolumeDescriptor {
        volume_id: volume.volume_id().map(str::to_string),
        volume_type: volume.volume_type().map(|t| t.as_str().to_string()),
    }
}

#[async_trait]
impl VolumeDescriber for Ec2VolumeDescriber {
    async fn describe_volumes(&self, volume_ids: &[String]) -> Result<Vec<VolumeDescriptor>> {
        let output = self
            .client
            .describe_volumes()
            .set_volume_ids(Some(volume_ids.to_vec()))
            .send()
            .await
            .map_err(|e| Error::CloudProvider {
                operation: "DescribeVolumes".to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(output.volumes().iter().map(descriptor).collect())
    }

    fn provider_name(&self) -> &str {
        "aws-ec2"
    }
}
