//! Node communication contract

use thiserror::Error;

use crate::node::NodeAddresses;
use crate::report::{reports, ReportItem};

/// Form-style request parameters, sent in order
pub type RequestData = Vec<(String, String)>;

/// Transport-level failure talking to a single node.
///
/// Timeouts are reported by the transport as one of these variants; callers
/// do not distinguish them from other communication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeCommunicationError {
    #[error("Unable to connect to {node} ({command}): {reason}")]
    UnableToConnect {
        node: String,
        command: String,
        reason: String,
    },

    #[error("Error communicating with {node} ({command}): {reason}")]
    Other {
        node: String,
        command: String,
        reason: String,
    },
}

impl NodeCommunicationError {
    pub fn unable_to_connect(node: &str, command: &str, reason: impl Into<String>) -> Self {
        Self::UnableToConnect {
            node: node.to_string(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn other(node: &str, command: &str, reason: impl Into<String>) -> Self {
        Self::Other {
            node: node.to_string(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Label of the node the failure belongs to
    pub fn node(&self) -> &str {
        match self {
            Self::UnableToConnect { node, .. } | Self::Other { node, .. } => node,
        }
    }

    /// Structured report for this failure
    pub fn to_report_item(&self) -> ReportItem {
        match self {
            Self::UnableToConnect { node, command, reason } => {
                reports::node_communication_error_unable_to_connect(node, command, reason)
            }
            Self::Other { node, command, reason } => {
                reports::node_communication_error(node, command, reason)
            }
        }
    }
}

impl From<NodeCommunicationError> for ReportItem {
    fn from(err: NodeCommunicationError) -> Self {
        err.to_report_item()
    }
}

/// Sends requests to the management daemon of a remote node.
///
/// Implementations own connection handling, authentication and timeouts.
#[async_trait::async_trait]
pub trait NodeCommunicator: Send + Sync {
    /// Call `request` (e.g. `remote/check_sbd`) on `node` and return the raw reply body
    async fn call_node(
        &self,
        node: &NodeAddresses,
        request: &str,
        data: Option<RequestData>,
    ) -> std::result::Result<String, NodeCommunicationError>;
}
