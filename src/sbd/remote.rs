//! Cluster-wide SBD operations
//!
//! Every operation here is sent to each node through the
//! [`ParallelDispatcher`](crate::dispatch::ParallelDispatcher). Failures are
//! isolated per node and raised together once all nodes have answered;
//! progress reports are emitted afterwards, in node order.

use serde::{Deserialize, Serialize};

use crate::dispatch::{bare_targets, NodeResult};
use crate::env::Environment;
use crate::error::Result;
use crate::external::{NodeCommunicator, RequestData};
use crate::node::NodeAddresses;
use crate::report::{reports, ReportItem};

use super::config::{create_sbd_config, parse_sbd_config, SbdConfig};

pub const CHECK_SBD: &str = "remote/check_sbd";
pub const SET_SBD_CONFIG: &str = "remote/set_sbd_config";
pub const GET_SBD_CONFIG: &str = "remote/get_sbd_config";
pub const SBD_ENABLE: &str = "remote/sbd_enable";
pub const SBD_DISABLE: &str = "remote/sbd_disable";
pub const SET_STONITH_WATCHDOG_TIMEOUT_TO_ZERO: &str = "remote/set_stonith_watchdog_timeout_to_zero";
pub const REMOVE_STONITH_WATCHDOG_TIMEOUT: &str = "remote/remove_stonith_watchdog_timeout";

/// Reply to a verification request
#[derive(Debug, Clone, Deserialize)]
struct CheckSbdReply {
    sbd: InstalledFlag,
    watchdog: ExistFlag,
    #[serde(default)]
    device_list: Vec<DeviceCheck>,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledFlag {
    installed: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ExistFlag {
    exist: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceCheck {
    path: String,
    exist: bool,
    block_device: bool,
}

/// What a node has to provide for SBD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbdNodeCheck {
    pub watchdog: String,
    pub devices: Vec<String>,
}

/// SBD service state reported by one node; `None` when unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbdStatus {
    #[serde(default)]
    pub installed: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub running: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSbdStatus {
    pub node: NodeAddresses,
    pub status: SbdStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSbdConfig {
    pub node: NodeAddresses,
    /// `None` when the config could not be obtained
    pub config: Option<SbdConfig>,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    sbd: SbdStatus,
}

fn check_sbd_request(watchdog: &str, devices: &[String]) -> RequestData {
    let device_list = serde_json::to_string(devices).unwrap_or_else(|_| "[]".to_string());
    vec![
        ("watchdog".to_string(), watchdog.to_string()),
        ("device_list".to_string(), device_list),
    ]
}

/// Evaluate a verification reply; an empty result means the node is fine
fn check_reply_errors(node: &str, watchdog: &str, reply: &str) -> Vec<ReportItem> {
    let reply: CheckSbdReply = match serde_json::from_str(reply) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(node, error = %e, "Malformed check_sbd reply");
            return vec![reports::invalid_response_format(node)];
        }
    };

    let mut errors = Vec::new();
    if !reply.sbd.installed {
        errors.push(reports::sbd_not_installed(node));
    }
    if !reply.watchdog.exist {
        errors.push(reports::watchdog_not_found(node, watchdog));
    }
    for device in &reply.device_list {
        if !device.exist {
            errors.push(reports::sbd_device_does_not_exist(&device.path, node));
        } else if !device.block_device {
            errors.push(reports::sbd_device_is_not_block_device(&device.path, node));
        }
    }
    errors
}

/// Verify SBD prerequisites on one node.
///
/// Returns the success report, or every violated condition.
pub async fn check_sbd_on_node(
    communicator: &dyn NodeCommunicator,
    node: &NodeAddresses,
    watchdog: &str,
    devices: &[String],
) -> NodeResult<ReportItem> {
    tracing::debug!(node = %node, watchdog, "Checking SBD prerequisites");
    let reply = communicator
        .call_node(node, CHECK_SBD, Some(check_sbd_request(watchdog, devices)))
        .await
        .map_err(|e| vec![e.to_report_item()])?;

    let errors = check_reply_errors(node.label(), watchdog, &reply);
    if errors.is_empty() {
        Ok(reports::sbd_check_success(node.label()))
    } else {
        Err(errors)
    }
}

/// Verify SBD prerequisites on every node; nothing passes unless all do
pub async fn check_sbd_on_all_nodes(env: &Environment, targets: Vec<(NodeAddresses, SbdNodeCheck)>) -> Result<()> {
    env.report(reports::sbd_check_started());
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(targets, |node, check| async move {
            check_sbd_on_node(communicator, &node, &check.watchdog, &check.devices).await
        })
        .await;

    let successes = outcome.into_successes()?;
    env.report_all(successes.into_iter().map(|(_, item)| item).collect());
    Ok(())
}

/// Store `config` as the SBD config of one node
pub async fn set_sbd_config(communicator: &dyn NodeCommunicator, node: &NodeAddresses, config: &str) -> NodeResult<()> {
    communicator
        .call_node(node, SET_SBD_CONFIG, Some(vec![("config".to_string(), config.to_string())]))
        .await
        .map(|_| ())
        .map_err(|e| vec![e.to_report_item()])
}

/// Push a generated SBD config to every node; `targets` pairs each node
/// with its watchdog
pub async fn set_sbd_config_on_all_nodes(
    env: &Environment,
    base: &SbdConfig,
    targets: Vec<(NodeAddresses, String)>,
    devices: &[String],
) -> Result<()> {
    env.report(reports::sbd_config_distribution_started());
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(targets, |node, watchdog| async move {
            let config = create_sbd_config(base, node.label(), &watchdog, devices);
            set_sbd_config(communicator, &node, &config).await
        })
        .await;

    let accepted = outcome.into_successes()?;
    env.report_all(
        accepted
            .iter()
            .map(|(node, _)| reports::sbd_config_accepted_by_node(node.label()))
            .collect(),
    );
    Ok(())
}

/// Send a parameterless request to every node and fail if any node failed
async fn call_on_all_nodes(env: &Environment, nodes: &[NodeAddresses], request: &str) -> Result<Vec<NodeAddresses>> {
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(bare_targets(nodes), |node, _| async move {
            communicator
                .call_node(&node, request, None)
                .await
                .map(|_| ())
                .map_err(|e| vec![e.to_report_item()])
        })
        .await;

    Ok(outcome
        .into_successes()?
        .into_iter()
        .map(|(node, _)| node)
        .collect())
}

pub async fn enable_sbd_service_on_all_nodes(env: &Environment, nodes: &[NodeAddresses]) -> Result<()> {
    let service = env.settings().sbd_service_name();
    let enabled = call_on_all_nodes(env, nodes, SBD_ENABLE).await?;
    env.report_all(
        enabled
            .iter()
            .map(|node| reports::service_enable_success(service, node.label()))
            .collect(),
    );
    Ok(())
}

pub async fn disable_sbd_service_on_all_nodes(env: &Environment, nodes: &[NodeAddresses]) -> Result<()> {
    let service = env.settings().sbd_service_name();
    let disabled = call_on_all_nodes(env, nodes, SBD_DISABLE).await?;
    env.report_all(
        disabled
            .iter()
            .map(|node| reports::service_disable_success(service, node.label()))
            .collect(),
    );
    Ok(())
}

/// Temporarily disable the watchdog-based fencing timeout on every node
pub async fn set_stonith_watchdog_timeout_to_zero_on_all_nodes(env: &Environment, nodes: &[NodeAddresses]) -> Result<()> {
    call_on_all_nodes(env, nodes, SET_STONITH_WATCHDOG_TIMEOUT_TO_ZERO)
        .await
        .map(|_| ())
}

pub async fn remove_stonith_watchdog_timeout_on_all_nodes(env: &Environment, nodes: &[NodeAddresses]) -> Result<()> {
    call_on_all_nodes(env, nodes, REMOVE_STONITH_WATCHDOG_TIMEOUT)
        .await
        .map(|_| ())
}

/// SBD status of every node. Unreachable nodes and malformed replies give
/// unknown values and a warning; this never fails.
pub async fn get_cluster_sbd_status(env: &Environment, nodes: &[NodeAddresses]) -> Vec<NodeSbdStatus> {
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(bare_targets(nodes), |node, _| async move {
            let reply = communicator
                .call_node(&node, CHECK_SBD, Some(check_sbd_request("", &[])))
                .await
                .map_err(|e| vec![reports::unable_to_get_sbd_status(node.label(), &e.to_string())])?;
            serde_json::from_str::<StatusReply>(&reply)
                .map(|reply| reply.sbd)
                .map_err(|e| vec![reports::unable_to_get_sbd_status(node.label(), &e.to_string())])
        })
        .await;

    env.report_all(outcome.failure_items());
    outcome
        .into_outcomes()
        .into_iter()
        .map(|o| NodeSbdStatus {
            node: o.node,
            status: o.result.unwrap_or_default(),
        })
        .collect()
}

/// SBD config of every node. Unreachable nodes give `None` and a warning;
/// this never fails.
pub async fn get_cluster_sbd_config(env: &Environment, nodes: &[NodeAddresses]) -> Vec<NodeSbdConfig> {
    let communicator = env.communicator();
    let outcome = env
        .dispatcher()
        .run(bare_targets(nodes), |node, _| async move {
            communicator
                .call_node(&node, GET_SBD_CONFIG, None)
                .await
                .map(|text| parse_sbd_config(&text))
                .map_err(|e| vec![reports::unable_to_get_sbd_config(node.label(), &e.to_string())])
        })
        .await;

    env.report_all(outcome.failure_items());
    outcome
        .into_outcomes()
        .into_iter()
        .map(|o| NodeSbdConfig {
            node: o.node,
            config: o.result.ok(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WolfQuorumConfig;
    use crate::external::NodeCommunicationError;
    use crate::report::{ReportCode, Severity};
    use crate::testing::{assert_report_items, CollectingReportSink, FakeCommandRunner, FakeNodeCommunicator};
    use serde_json::json;
    use std::sync::Arc;

    const OK_REPLY: &str = r#"{"sbd": {"installed": true}, "watchdog": {"exist": true}}"#;

    fn nodes(count: usize) -> Vec<NodeAddresses> {
        (1..=count).map(|i| NodeAddresses::new(format!("node{i}"))).collect()
    }

    fn environment(communicator: FakeNodeCommunicator) -> (Environment, Arc<FakeNodeCommunicator>, Arc<CollectingReportSink>) {
        let communicator = Arc::new(communicator);
        let sink = Arc::new(CollectingReportSink::new());
        let env = Environment::new(
            WolfQuorumConfig::default(),
            Arc::new(FakeCommandRunner::new()),
            communicator.clone(),
            sink.clone(),
        );
        (env, communicator, sink)
    }

    async fn check_node(reply: &str) -> NodeResult<ReportItem> {
        let communicator = FakeNodeCommunicator::new().with_reply("node1", CHECK_SBD, reply);
        let devices = vec!["/dev/sdb".to_string(), "/dev/sdc".to_string()];
        check_sbd_on_node(&communicator, &NodeAddresses::new("node1"), "/dev/watchdog", &devices).await
    }

    #[tokio::test]
    async fn test_check_request_data() {
        let communicator = FakeNodeCommunicator::new().with_reply("node1", CHECK_SBD, OK_REPLY);
        let devices = vec!["/dev/sdb1".to_string(), "/dev/sdc".to_string()];
        check_sbd_on_node(&communicator, &NodeAddresses::new("node1"), "/dev/watchdog", &devices)
            .await
            .unwrap();

        let calls = communicator.calls_for(CHECK_SBD);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].param("watchdog"), Some("/dev/watchdog"));
        assert_eq!(calls[0].param("device_list"), Some(r#"["/dev/sdb1","/dev/sdc"]"#));
    }

    #[tokio::test]
    async fn test_check_success() {
        let item = check_node(OK_REPLY).await.unwrap();
        assert_report_items(
            &[item],
            &[(Severity::Info, ReportCode::SbdCheckSuccess, json!({"node": "node1"}))],
        );
    }

    #[tokio::test]
    async fn test_check_unable_to_connect() {
        let communicator = FakeNodeCommunicator::new().with_failure(
            "node1",
            CHECK_SBD,
            NodeCommunicationError::unable_to_connect("node1", CHECK_SBD, "reason"),
        );
        let items = check_sbd_on_node(&communicator, &NodeAddresses::new("node1"), "/dev/watchdog", &[])
            .await
            .unwrap_err();
        assert_report_items(
            &items,
            &[(
                Severity::Error,
                ReportCode::NodeCommunicationErrorUnableToConnect,
                json!({"node": "node1", "command": CHECK_SBD, "reason": "reason"}),
            )],
        );
    }

    #[tokio::test]
    async fn test_check_invalid_json() {
        let items = check_node("invalid JSON").await.unwrap_err();
        assert_report_items(
            &items,
            &[(Severity::Error, ReportCode::InvalidResponseFormat, json!({"node": "node1"}))],
        );
    }

    #[tokio::test]
    async fn test_check_missing_installed_section() {
        let items = check_node(r#"{"not_sbd": {"installed": false}, "watchdog": {"exist": false}}"#)
            .await
            .unwrap_err();
        assert_report_items(
            &items,
            &[(Severity::Error, ReportCode::InvalidResponseFormat, json!({"node": "node1"}))],
        );
    }

    #[tokio::test]
    async fn test_check_not_installed_and_no_watchdog() {
        let items = check_node(r#"{"sbd": {"installed": false}, "watchdog": {"exist": false}}"#)
            .await
            .unwrap_err();
        assert_report_items(
            &items,
            &[
                (Severity::Error, ReportCode::SbdNotInstalled, json!({"node": "node1"})),
                (
                    Severity::Error,
                    ReportCode::WatchdogNotFound,
                    json!({"node": "node1", "watchdog": "/dev/watchdog"}),
                ),
            ],
        );
    }

    #[tokio::test]
    async fn test_check_device_issues() {
        let reply = json!({
            "sbd": {"installed": true},
            "watchdog": {"exist": true},
            "device_list": [
                {"path": "/dev/sdb", "exist": true, "block_device": false},
                {"path": "/dev/sdc", "exist": false, "block_device": false},
            ]
        });
        let items = check_node(&reply.to_string()).await.unwrap_err();
        assert_report_items(
            &items,
            &[
                (
                    Severity::Error,
                    ReportCode::SbdDeviceIsNotBlockDevice,
                    json!({"device": "/dev/sdb", "node": "node1"}),
                ),
                (
                    Severity::Error,
                    ReportCode::SbdDeviceDoesNotExist,
                    json!({"device": "/dev/sdc", "node": "node1"}),
                ),
            ],
        );
    }

    #[tokio::test]
    async fn test_check_all_nodes_reports_after_fan_out() {
        let mut communicator = FakeNodeCommunicator::new();
        for node in nodes(3) {
            communicator = communicator.with_reply(node.label(), CHECK_SBD, OK_REPLY);
        }
        let (env, communicator, sink) = environment(communicator);

        let targets = nodes(3)
            .into_iter()
            .map(|node| {
                let watchdog = format!("/dev/watchdog-{}", node.label());
                (node, SbdNodeCheck { watchdog, devices: Vec::new() })
            })
            .collect();
        check_sbd_on_all_nodes(&env, targets).await.unwrap();

        let calls = communicator.calls_for(CHECK_SBD);
        assert_eq!(calls.len(), 3);
        let node2 = calls.iter().find(|call| call.node == "node2").unwrap();
        assert_eq!(node2.param("watchdog"), Some("/dev/watchdog-node2"));

        assert_report_items(
            &sink.items(),
            &[
                (Severity::Info, ReportCode::SbdCheckStarted, json!({})),
                (Severity::Info, ReportCode::SbdCheckSuccess, json!({"node": "node1"})),
                (Severity::Info, ReportCode::SbdCheckSuccess, json!({"node": "node2"})),
                (Severity::Info, ReportCode::SbdCheckSuccess, json!({"node": "node3"})),
            ],
        );
    }

    #[tokio::test]
    async fn test_check_all_nodes_aggregates_failures() {
        let communicator = FakeNodeCommunicator::new()
            .with_reply("node1", CHECK_SBD, OK_REPLY)
            .with_reply("node2", CHECK_SBD, r#"{"sbd": {"installed": false}, "watchdog": {"exist": false}}"#)
            .with_failure("node3", CHECK_SBD, NodeCommunicationError::other("node3", CHECK_SBD, "boom"));
        let (env, _, sink) = environment(communicator);

        let targets = nodes(3)
            .into_iter()
            .map(|node| (node, SbdNodeCheck { watchdog: "/dev/watchdog".into(), devices: Vec::new() }))
            .collect();
        let err = check_sbd_on_all_nodes(&env, targets).await.unwrap_err();

        let codes: Vec<_> = err.report_items().iter().map(|item| item.code).collect();
        assert_eq!(
            codes,
            vec![
                ReportCode::SbdNotInstalled,
                ReportCode::WatchdogNotFound,
                ReportCode::NodeCommunicationError,
            ]
        );
        assert_eq!(sink.items().len(), 1);
    }

    #[tokio::test]
    async fn test_set_config_on_all_nodes() {
        let (env, communicator, sink) = environment(FakeNodeCommunicator::new());
        let base = SbdConfig::from([("SBD_WATCHDOG_TIMEOUT".to_string(), "0".to_string())]);
        let targets = nodes(2)
            .into_iter()
            .zip(["/dev/watchdog1", "/dev/watchdog2"])
            .map(|(node, watchdog)| (node, watchdog.to_string()))
            .collect();

        set_sbd_config_on_all_nodes(&env, &base, targets, &[]).await.unwrap();

        let calls = communicator.calls_for(SET_SBD_CONFIG);
        let node2 = calls.iter().find(|call| call.node == "node2").unwrap();
        assert_eq!(
            node2.param("config"),
            Some(
                "# This file has been generated by wolfquorum.\n\
                 SBD_OPTS=\"-n node2\"\n\
                 SBD_WATCHDOG_DEV=/dev/watchdog2\n\
                 SBD_WATCHDOG_TIMEOUT=0\n"
            )
        );
        assert_report_items(
            &sink.items(),
            &[
                (Severity::Info, ReportCode::SbdConfigDistributionStarted, json!({})),
                (Severity::Info, ReportCode::SbdConfigAcceptedByNode, json!({"node": "node1"})),
                (Severity::Info, ReportCode::SbdConfigAcceptedByNode, json!({"node": "node2"})),
            ],
        );
    }

    #[tokio::test]
    async fn test_stonith_watchdog_timeout_failures() {
        let node_list = nodes(5);
        let communicator = FakeNodeCommunicator::new()
            .with_failure(
                "node2",
                SET_STONITH_WATCHDOG_TIMEOUT_TO_ZERO,
                NodeCommunicationError::unable_to_connect("node2", "command", "reason"),
            )
            .with_failure(
                "node5",
                SET_STONITH_WATCHDOG_TIMEOUT_TO_ZERO,
                NodeCommunicationError::other("node5", "command", "reason"),
            );
        let (env, communicator, _) = environment(communicator);

        let err = set_stonith_watchdog_timeout_to_zero_on_all_nodes(&env, &node_list)
            .await
            .unwrap_err();

        assert_eq!(communicator.calls_for(SET_STONITH_WATCHDOG_TIMEOUT_TO_ZERO).len(), 5);
        assert_report_items(
            err.report_items(),
            &[
                (
                    Severity::Error,
                    ReportCode::NodeCommunicationErrorUnableToConnect,
                    json!({"node": "node2", "command": "command", "reason": "reason"}),
                ),
                (
                    Severity::Error,
                    ReportCode::NodeCommunicationError,
                    json!({"node": "node5", "command": "command", "reason": "reason"}),
                ),
            ],
        );
    }

    #[tokio::test]
    async fn test_remove_stonith_watchdog_timeout() {
        let (env, communicator, _) = environment(FakeNodeCommunicator::new());
        remove_stonith_watchdog_timeout_on_all_nodes(&env, &nodes(3)).await.unwrap();

        let calls = communicator.calls_for(REMOVE_STONITH_WATCHDOG_TIMEOUT);
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|call| call.data.is_none()));
    }

    #[tokio::test]
    async fn test_enable_and_disable_service() {
        let (env, communicator, sink) = environment(FakeNodeCommunicator::new());
        enable_sbd_service_on_all_nodes(&env, &nodes(2)).await.unwrap();
        disable_sbd_service_on_all_nodes(&env, &nodes(1)).await.unwrap();

        assert_eq!(communicator.calls_for(SBD_ENABLE).len(), 2);
        assert_eq!(communicator.calls_for(SBD_DISABLE).len(), 1);
        assert_report_items(
            &sink.items(),
            &[
                (Severity::Info, ReportCode::ServiceEnableSuccess, json!({"service": "sbd", "node": "node1"})),
                (Severity::Info, ReportCode::ServiceEnableSuccess, json!({"service": "sbd", "node": "node2"})),
                (Severity::Info, ReportCode::ServiceDisableSuccess, json!({"service": "sbd", "node": "node1"})),
            ],
        );
    }

    #[tokio::test]
    async fn test_cluster_status() {
        let communicator = FakeNodeCommunicator::new()
            .with_reply(
                "node1",
                CHECK_SBD,
                r#"{"sbd": {"installed": true, "enabled": true, "running": false}, "watchdog": {"exist": false}}"#,
            )
            .with_failure("node2", CHECK_SBD, NodeCommunicationError::other("node2", CHECK_SBD, "down"))
            .with_reply("node3", CHECK_SBD, "garbage");
        let (env, _, sink) = environment(communicator);

        let status = get_cluster_sbd_status(&env, &nodes(3)).await;
        assert_eq!(status.len(), 3);
        assert_eq!(
            status[0].status,
            SbdStatus {
                installed: Some(true),
                enabled: Some(true),
                running: Some(false),
            }
        );
        assert_eq!(status[1].status, SbdStatus::default());
        assert_eq!(status[2].status, SbdStatus::default());

        let items = sink.items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.severity == Severity::Warning));
        assert!(items.iter().all(|item| item.code == ReportCode::UnableToGetSbdStatus));
        assert_eq!(items[0].node(), Some("node2"));
        assert_eq!(items[1].node(), Some("node3"));
    }

    #[tokio::test]
    async fn test_cluster_config() {
        let communicator = FakeNodeCommunicator::new()
            .with_reply("node1", GET_SBD_CONFIG, "SBD_WATCHDOG_DEV=/dev/watchdog\nSBD_OPTS=\"-n node1\"\n")
            .with_failure(
                "node2",
                GET_SBD_CONFIG,
                NodeCommunicationError::unable_to_connect("node2", GET_SBD_CONFIG, "refused"),
            );
        let (env, _, sink) = environment(communicator);

        let configs = get_cluster_sbd_config(&env, &nodes(2)).await;
        let first = configs[0].config.as_ref().unwrap();
        assert_eq!(first["SBD_WATCHDOG_DEV"], "/dev/watchdog");
        assert_eq!(first["SBD_OPTS"], "-n node1");
        assert!(configs[1].config.is_none());

        let items = sink.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, ReportCode::UnableToGetSbdConfig);
        assert_eq!(items[0].severity, Severity::Warning);
    }
}
