//! External Collaborators
//!
//! Narrow contracts for everything outside this crate: running local
//! processes and talking to remote cluster nodes.

mod communicator;
mod runner;

pub use communicator::{NodeCommunicationError, NodeCommunicator, RequestData};
pub use runner::{CommandOutput, CommandRunner, TokioCommandRunner};
