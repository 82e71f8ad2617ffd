//! Cluster node addressing

use std::fmt;

use serde::{Deserialize, Serialize};

/// Addresses of a single cluster node as described by the nodelist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddresses {
    /// Primary ring address
    pub ring0: String,
    /// Redundant ring address
    #[serde(default)]
    pub ring1: Option<String>,
    /// Human-facing node name
    #[serde(default)]
    pub name: Option<String>,
    /// Node id as written in the config; opaque and not checked for uniqueness
    #[serde(default)]
    pub id: Option<String>,
}

impl NodeAddresses {
    /// Node known only by its primary address
    pub fn new(ring0: impl Into<String>) -> Self {
        Self {
            ring0: ring0.into(),
            ring1: None,
            name: None,
            id: None,
        }
    }

    pub fn with_ring1(mut self, ring1: impl Into<String>) -> Self {
        self.ring1 = Some(ring1.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Name used for addressing and reporting; falls back to ring0
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.ring0)
    }
}

impl fmt::Display for NodeAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
