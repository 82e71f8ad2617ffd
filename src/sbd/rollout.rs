//! Enabling and disabling SBD across the cluster

use std::collections::{BTreeMap, BTreeSet};

use crate::consistency::is_auto_tie_breaker_needed;
use crate::corosync::live::distribute_corosync_conf;
use crate::corosync::ConfigFacade;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::node::NodeAddresses;
use crate::report::{reports, ReportItem};

use super::config::{validate_sbd_options, SbdConfig};
use super::remote::{
    check_sbd_on_all_nodes, disable_sbd_service_on_all_nodes, enable_sbd_service_on_all_nodes,
    remove_stonith_watchdog_timeout_on_all_nodes, set_sbd_config_on_all_nodes,
    set_stonith_watchdog_timeout_to_zero_on_all_nodes, SbdNodeCheck,
};

/// Parameters of an SBD rollout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbdEnableRequest {
    /// Watchdog for nodes without an override
    pub default_watchdog: String,
    /// Node label -> watchdog
    pub watchdogs: BTreeMap<String, String>,
    /// Shared block devices; empty for watchdog-only fencing
    pub devices: Vec<String>,
    /// User-supplied SBD options
    pub options: SbdConfig,
    /// Downgrade unknown options to warnings
    pub allow_unknown_opts: bool,
}

impl Default for SbdEnableRequest {
    fn default() -> Self {
        Self {
            default_watchdog: "/dev/watchdog".to_string(),
            watchdogs: BTreeMap::new(),
            devices: Vec::new(),
            options: SbdConfig::new(),
            allow_unknown_opts: false,
        }
    }
}

impl SbdEnableRequest {
    fn watchdog_for(&self, node: &NodeAddresses) -> &str {
        self.watchdogs
            .get(node.label())
            .map(String::as_str)
            .unwrap_or(&self.default_watchdog)
    }

    fn validate(&self, nodes: &[NodeAddresses]) -> Vec<ReportItem> {
        let labels: BTreeSet<&str> = nodes.iter().map(NodeAddresses::label).collect();
        let mut items: Vec<ReportItem> = self
            .watchdogs
            .keys()
            .filter(|node| !labels.contains(node.as_str()))
            .map(|node| reports::invalid_watchdog_node(node))
            .collect();
        items.extend(validate_sbd_options(&self.options, self.allow_unknown_opts));
        items
    }
}

/// Roll SBD out to every node of the cluster described by `facade`.
///
/// Nothing is changed on any node unless validation and the per-node
/// checks pass everywhere. For watchdog-only SBD on an even node count,
/// auto-tie-breaker is switched on and corosync.conf redistributed first.
pub async fn enable_sbd(env: &Environment, facade: &mut ConfigFacade, request: &SbdEnableRequest) -> Result<()> {
    let nodes = facade.get_nodes();

    let (errors, warnings): (Vec<_>, Vec<_>) = request
        .validate(&nodes)
        .into_iter()
        .partition(ReportItem::is_error);
    env.report_all(warnings);
    if !errors.is_empty() {
        return Err(Error::library(errors));
    }

    let checks = nodes
        .iter()
        .map(|node| {
            let check = SbdNodeCheck {
                watchdog: request.watchdog_for(node).to_string(),
                devices: request.devices.clone(),
            };
            (node.clone(), check)
        })
        .collect();
    check_sbd_on_all_nodes(env, checks).await?;

    if request.devices.is_empty() && !facade.is_enabled_auto_tie_breaker() && is_auto_tie_breaker_needed(facade, 0) {
        env.report(reports::sbd_requires_atb());
        let options = BTreeMap::from([("auto_tie_breaker".to_string(), "1".to_string())]);
        // the caller's facade only changes once every node has the new config
        let mut updated = facade.clone();
        updated.set_quorum_options(&options)?;
        distribute_corosync_conf(env, &nodes, &updated.export()).await?;
        *facade = updated;
    }

    let watchdogs = nodes
        .iter()
        .map(|node| (node.clone(), request.watchdog_for(node).to_string()))
        .collect();
    set_sbd_config_on_all_nodes(env, &request.options, watchdogs, &request.devices).await?;
    remove_stonith_watchdog_timeout_on_all_nodes(env, &nodes).await?;

    env.report(reports::sbd_enabling_started());
    enable_sbd_service_on_all_nodes(env, &nodes).await
}

/// Disable SBD on every node
pub async fn disable_sbd(env: &Environment, nodes: &[NodeAddresses]) -> Result<()> {
    set_stonith_watchdog_timeout_to_zero_on_all_nodes(env, nodes).await?;
    env.report(reports::sbd_disabling_started());
    disable_sbd_service_on_all_nodes(env, nodes).await
}
