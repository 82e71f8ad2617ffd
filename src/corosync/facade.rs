//! Corosync Configuration Facade
//!
//! Typed, validated access to the parts of corosync.conf this crate manages.
//! Reads merge every same-named section; writes go to the first `quorum`
//! section only.

use std::collections::BTreeMap;

use super::parser::{ConfigDocument, Section};
use crate::error::{Error, Result};
use crate::node::NodeAddresses;
use crate::report::{reports, ReportItem};

/// Quorum options understood by the facade
pub const QUORUM_OPTIONS: [&str; 4] = [
    "auto_tie_breaker",
    "last_man_standing",
    "last_man_standing_window",
    "wait_for_all",
];

const BOOLEAN_QUORUM_OPTIONS: [&str; 3] = ["auto_tie_breaker", "last_man_standing", "wait_for_all"];

/// Recognized quorum option name -> value
pub type QuorumOptions = BTreeMap<String, String>;

/// Semantic view over a [`ConfigDocument`]
#[derive(Debug, Clone)]
pub struct ConfigFacade {
    config: ConfigDocument,
}

impl ConfigFacade {
    pub fn new(config: ConfigDocument) -> Self {
        Self { config }
    }

    /// Parse corosync.conf text
    pub fn from_string(text: &str) -> Result<Self> {
        Ok(Self::new(ConfigDocument::parse(text)?))
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn into_config(self) -> ConfigDocument {
        self.config
    }

    /// Serialize the underlying document
    pub fn export(&self) -> String {
        self.config.export()
    }

    /// Every node of every `nodelist` section, in document order
    pub fn get_nodes(&self) -> Vec<NodeAddresses> {
        let mut nodes = Vec::new();
        for nodelist in self.config.sections("nodelist") {
            for node in nodelist.sections("node") {
                match node_from_section(node) {
                    Some(addresses) => nodes.push(addresses),
                    None => tracing::warn!("Skipping nodelist entry without ring0_addr"),
                }
            }
        }
        nodes
    }

    /// Recognized quorum options merged across all `quorum` sections.
    ///
    /// Later sections and later lines override earlier ones.
    pub fn get_quorum_options(&self) -> QuorumOptions {
        let mut options = QuorumOptions::new();
        for quorum in self.config.sections("quorum") {
            for (key, value) in quorum.attributes() {
                if QUORUM_OPTIONS.contains(&key) {
                    options.insert(key.to_string(), value.to_string());
                }
            }
        }
        options
    }

    /// Set quorum options; an empty value removes the option.
    ///
    /// All options are validated first and every problem is reported together.
    /// The document is left untouched unless validation passes.
    pub fn set_quorum_options(&mut self, options: &BTreeMap<String, String>) -> Result<()> {
        let report_items = validate_quorum_options(options);
        if !report_items.is_empty() {
            return Err(Error::library(report_items));
        }

        let root = self.config.root_mut();
        if root.section("quorum").is_none() {
            if options.values().all(|value| value.is_empty()) {
                return Ok(());
            }
            root.add_section("quorum");
        }

        let quorum = root
            .section_mut("quorum")
            .ok_or_else(|| Error::Internal("quorum section disappeared".into()))?;
        for (name, value) in options {
            if value.is_empty() {
                quorum.remove_attributes(name);
            } else {
                quorum.set_attribute(name, value);
            }
        }

        let mut first = true;
        root.remove_sections_where(|section| {
            if !first || section.name() != "quorum" {
                return false;
            }
            first = false;
            section.is_created() && section.is_empty()
        });

        Ok(())
    }

    /// Whether any `quorum` section configures an arbitration device
    pub fn has_quorum_device(&self) -> bool {
        self.config
            .sections("quorum")
            .any(|quorum| quorum.section("device").is_some())
    }

    pub fn is_enabled_auto_tie_breaker(&self) -> bool {
        self.get_quorum_options()
            .get("auto_tie_breaker")
            .map(|value| value == "1")
            .unwrap_or(false)
    }
}

fn node_from_section(node: &Section) -> Option<NodeAddresses> {
    let ring0 = node.attribute("ring0_addr")?;
    Some(NodeAddresses {
        ring0: ring0.to_string(),
        ring1: node.attribute("ring1_addr").map(str::to_string),
        name: node.attribute("name").map(str::to_string),
        id: node.attribute("nodeid").map(str::to_string),
    })
}

fn validate_quorum_options(options: &BTreeMap<String, String>) -> Vec<ReportItem> {
    let mut items = Vec::new();
    for (name, value) in options {
        if !QUORUM_OPTIONS.contains(&name.as_str()) {
            items.push(reports::invalid_option(name, &QUORUM_OPTIONS, "quorum"));
            continue;
        }
        if value.is_empty() {
            continue;
        }
        if BOOLEAN_QUORUM_OPTIONS.contains(&name.as_str()) {
            if value != "0" && value != "1" {
                items.push(reports::invalid_option_value(name, value, &["0", "1"]));
            }
        } else if !is_non_negative_integer(value) {
            items.push(reports::invalid_option_type(name, value, &["integer"]));
        }
    }
    items
}

fn is_non_negative_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
