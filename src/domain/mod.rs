//! Domain layer - Cluster records and port definitions
//!
//! This module defines the records the engine correlates and the traits
//! (ports) that cluster and cloud adapters implement, following hexagonal
//! architecture principles.

pub mod ports;

pub use ports::*;
