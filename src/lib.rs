//! WolfQuorum - Cluster Quorum and Fencing Posture Manager
//!
//! Configures and verifies the quorum and fencing setup of a corosync-based
//! cluster that fences through SBD (watchdog and optional shared block
//! devices).
//!
//! # Architecture
//!
//! corosync.conf is parsed into a lossless document tree and edited through
//! a validating facade. Cluster-wide work fans out to every node through a
//! bounded parallel dispatcher that isolates per-node failures and raises
//! them together as structured report items.
//!
//! # Features
//!
//! - Byte-faithful corosync.conf round trip with targeted edits
//! - Validated quorum option updates
//! - Auto-tie-breaker decisions from node parity and quorum device presence
//! - Parallel SBD verification, config distribution and service control
//! - Local SBD device initialization and messaging
//!
//! External effects go through three narrow contracts: a
//! [`CommandRunner`](external::CommandRunner), a
//! [`NodeCommunicator`](external::NodeCommunicator) and a
//! [`ReportSink`](report::ReportSink).

pub mod config;
pub mod consistency;
pub mod corosync;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod external;
pub mod logging;
pub mod node;
pub mod report;
pub mod sbd;
pub mod testing;

pub use config::WolfQuorumConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfQuorumConfig;
    pub use crate::consistency::{atb_has_to_be_enabled, is_auto_tie_breaker_needed, SbdPosture};
    pub use crate::corosync::{ConfigDocument, ConfigFacade};
    pub use crate::dispatch::ParallelDispatcher;
    pub use crate::env::Environment;
    pub use crate::error::{Error, Result};
    pub use crate::external::{CommandRunner, NodeCommunicator};
    pub use crate::node::NodeAddresses;
    pub use crate::report::{ReportCode, ReportItem, ReportSink, Severity};
    pub use crate::sbd::{LocalSbd, SbdEnableRequest};
}
