//! SBD Fencing
//!
//! Configuration file handling, local `sbd` tooling, the cluster-wide
//! verifier with its sibling fan-out operations, and enable/disable
//! orchestration.

pub mod config;
pub mod local;
pub mod remote;
pub mod rollout;

pub use config::SbdConfig;
pub use local::LocalSbd;
pub use remote::{NodeSbdConfig, NodeSbdStatus, SbdNodeCheck, SbdStatus};
pub use rollout::{disable_sbd, enable_sbd, SbdEnableRequest};
