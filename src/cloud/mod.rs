//! Cloud Module
//!
//! Cloud provider adapters for the volume describer port.

#[cfg(feature = "ec2")]
pub mod ec2;

#[cfg(feature = "ec2")]
pub use ec2::Ec2VolumeDescriber;
