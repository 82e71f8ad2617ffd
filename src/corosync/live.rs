//! Pushing corosync.conf to a running cluster

use crate::corosync::ConfigFacade;
use crate::dispatch::NodeResult;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::external::NodeCommunicator;
use crate::node::NodeAddresses;
use crate::report::reports;

pub const SET_COROSYNC_CONF: &str = "remote/set_corosync_conf";

/// Read and parse the local corosync.conf named by `paths.corosync_conf`
pub fn load_local_corosync_conf(env: &Environment) -> Result<ConfigFacade> {
    let path = &env.settings().paths.corosync_conf;
    let text = std::fs::read_to_string(path).map_err(|e| {
        reports::unable_to_read_corosync_config(&path.to_string_lossy(), &e.to_string())
    })?;
    ConfigFacade::from_string(&text)
}

/// Store `config_text` as corosync.conf on one node
pub async fn set_remote_corosync_conf(
    communicator: &dyn NodeCommunicator,
    node: &NodeAddresses,
    config_text: &str,
) -> NodeResult<()> {
    communicator
        .call_node(
            node,
            SET_COROSYNC_CONF,
            Some(vec![("corosync_conf".to_string(), config_text.to_string())]),
        )
        .await
        .map(|_| ())
        .map_err(|e| {
            vec![
                e.to_report_item(),
                reports::node_corosync_conf_save_error(node.label()),
            ]
        })
}

/// Ask the local corosync to re-read its configuration
pub async fn reload_config(env: &Environment) -> Result<()> {
    let args = vec![
        env.settings()
            .binaries
            .corosync_cfgtool
            .to_string_lossy()
            .into_owned(),
        "-R".to_string(),
    ];
    let output = env
        .runner()
        .run(&args)
        .await
        .map_err(|e| Error::from(reports::corosync_config_reload_error(&e.to_string())))?;
    if !output.success() {
        return Err(reports::corosync_config_reload_error(&output.joined_output()).into());
    }
    Ok(())
}

/// Send corosync.conf to every node, then reload it locally.
///
/// The reload only happens when every node accepted the config.
pub async fn distribute_corosync_conf(env: &Environment, nodes: &[NodeAddresses], config_text: &str) -> Result<()> {
    env.report(reports::corosync_config_distribution_started());
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(crate::dispatch::bare_targets(nodes), |node, _| async move {
            set_remote_corosync_conf(communicator, &node, config_text).await
        })
        .await;

    let accepted = outcome.into_successes()?;
    env.report_all(
        accepted
            .iter()
            .map(|(node, _)| reports::corosync_config_accepted_by_node(node.label()))
            .collect(),
    );

    reload_config(env).await?;
    env.report(reports::corosync_config_reloaded());
    Ok(())
}
