//! Corosync Configuration
//!
//! Parsing and round-tripping corosync.conf, the semantic facade over it,
//! and pushing a new config to a running cluster.

pub mod facade;
pub mod live;
pub mod parser;

pub use facade::{ConfigFacade, QuorumOptions, QUORUM_OPTIONS};
pub use parser::{ConfigDocument, ParseError, Section};
