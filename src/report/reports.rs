//! Report item constructors
//!
//! One function per report code so that attribute names stay consistent
//! across the crate.

use serde_json::{json, Value};

use super::{ReportCode, ReportItem};

fn node_attr(node: &str) -> [(&'static str, Value); 1] {
    [("node", json!(node))]
}

pub fn corosync_conf_missing_closing_brace(line: usize) -> ReportItem {
    ReportItem::error(
        ReportCode::ParseErrorCorosyncConfMissingClosingBrace,
        [("line", json!(line))],
    )
}

pub fn corosync_conf_unexpected_closing_brace(line: usize) -> ReportItem {
    ReportItem::error(
        ReportCode::ParseErrorCorosyncConfUnexpectedClosingBrace,
        [("line", json!(line))],
    )
}

/// Unknown option name for an option group (e.g. "quorum")
pub fn invalid_option(option: &str, allowed: &[&str], option_type: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::InvalidOption,
        [
            ("option", json!(option)),
            ("type", json!(option_type)),
            ("allowed", json!(allowed)),
        ],
    )
}

/// Option value outside an enumerated set of allowed values
pub fn invalid_option_value(name: &str, value: &str, allowed: &[&str]) -> ReportItem {
    ReportItem::error(
        ReportCode::InvalidOptionValue,
        [
            ("option_name", json!(name)),
            ("option_value", json!(value)),
            ("allowed_values_raw", json!(allowed)),
            ("allowed_values", json!(allowed.join(" or "))),
        ],
    )
}

/// Option value of the wrong type
pub fn invalid_option_type(name: &str, value: &str, allowed_types: &[&str]) -> ReportItem {
    ReportItem::error(
        ReportCode::InvalidOptionValue,
        [
            ("option_name", json!(name)),
            ("option_value", json!(value)),
            ("allowed_types_raw", json!(allowed_types)),
            ("allowed_values", json!(allowed_types.join(" or "))),
        ],
    )
}

pub fn node_communication_error(node: &str, command: &str, reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::NodeCommunicationError,
        [
            ("node", json!(node)),
            ("command", json!(command)),
            ("reason", json!(reason)),
        ],
    )
}

pub fn node_communication_error_unable_to_connect(
    node: &str,
    command: &str,
    reason: &str,
) -> ReportItem {
    ReportItem::error(
        ReportCode::NodeCommunicationErrorUnableToConnect,
        [
            ("node", json!(node)),
            ("command", json!(command)),
            ("reason", json!(reason)),
        ],
    )
}

pub fn invalid_response_format(node: &str) -> ReportItem {
    ReportItem::error(ReportCode::InvalidResponseFormat, node_attr(node))
}

pub fn sbd_not_installed(node: &str) -> ReportItem {
    ReportItem::error(ReportCode::SbdNotInstalled, node_attr(node))
}

pub fn watchdog_not_found(node: &str, watchdog: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::WatchdogNotFound,
        [("node", json!(node)), ("watchdog", json!(watchdog))],
    )
}

pub fn sbd_device_does_not_exist(device: &str, node: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceDoesNotExist,
        [("device", json!(device)), ("node", json!(node))],
    )
}

pub fn sbd_device_is_not_block_device(device: &str, node: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceIsNotBlockDevice,
        [("device", json!(device)), ("node", json!(node))],
    )
}

pub fn sbd_check_started() -> ReportItem {
    ReportItem::info(ReportCode::SbdCheckStarted, Vec::<(String, Value)>::new())
}

pub fn sbd_check_success(node: &str) -> ReportItem {
    ReportItem::info(ReportCode::SbdCheckSuccess, node_attr(node))
}

pub fn sbd_config_distribution_started() -> ReportItem {
    ReportItem::info(
        ReportCode::SbdConfigDistributionStarted,
        Vec::<(String, Value)>::new(),
    )
}

pub fn sbd_config_accepted_by_node(node: &str) -> ReportItem {
    ReportItem::info(ReportCode::SbdConfigAcceptedByNode, node_attr(node))
}

pub fn sbd_enabling_started() -> ReportItem {
    ReportItem::info(ReportCode::SbdEnablingStarted, Vec::<(String, Value)>::new())
}

pub fn sbd_disabling_started() -> ReportItem {
    ReportItem::info(ReportCode::SbdDisablingStarted, Vec::<(String, Value)>::new())
}

pub fn sbd_requires_atb() -> ReportItem {
    ReportItem::warning(ReportCode::SbdRequiresAtb, Vec::<(String, Value)>::new())
}

pub fn service_enable_success(service: &str, node: &str) -> ReportItem {
    ReportItem::info(
        ReportCode::ServiceEnableSuccess,
        [("service", json!(service)), ("node", json!(node))],
    )
}

pub fn service_disable_success(service: &str, node: &str) -> ReportItem {
    ReportItem::info(
        ReportCode::ServiceDisableSuccess,
        [("service", json!(service)), ("node", json!(node))],
    )
}

pub fn sbd_device_initialization_started(devices: &[String]) -> ReportItem {
    ReportItem::info(
        ReportCode::SbdDeviceInitializationStarted,
        [("device_list", json!(devices))],
    )
}

pub fn sbd_device_initialization_success(devices: &[String]) -> ReportItem {
    ReportItem::info(
        ReportCode::SbdDeviceInitializationSuccess,
        [("device_list", json!(devices))],
    )
}

pub fn sbd_device_initialization_error(devices: &[String], reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceInitializationError,
        [("device_list", json!(devices)), ("reason", json!(reason))],
    )
}

pub fn sbd_device_list_error(device: &str, reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceListError,
        [("device", json!(device)), ("reason", json!(reason))],
    )
}

pub fn sbd_device_dump_error(device: &str, reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceDumpError,
        [("device", json!(device)), ("reason", json!(reason))],
    )
}

pub fn sbd_device_message_error(device: &str, node: &str, message: &str, reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::SbdDeviceMessageError,
        [
            ("device", json!(device)),
            ("node", json!(node)),
            ("message", json!(message)),
            ("reason", json!(reason)),
        ],
    )
}

pub fn unable_to_get_sbd_config(node: &str, reason: &str) -> ReportItem {
    ReportItem::warning(
        ReportCode::UnableToGetSbdConfig,
        [("node", json!(node)), ("reason", json!(reason))],
    )
}

pub fn unable_to_get_sbd_status(node: &str, reason: &str) -> ReportItem {
    ReportItem::warning(
        ReportCode::UnableToGetSbdStatus,
        [("node", json!(node)), ("reason", json!(reason))],
    )
}

pub fn invalid_watchdog_node(node: &str) -> ReportItem {
    ReportItem::error(ReportCode::InvalidWatchdogNode, node_attr(node))
}

pub fn unsupported_sbd_option(option: &str, allowed: &[&str]) -> ReportItem {
    ReportItem::error(
        ReportCode::UnsupportedSbdOption,
        [("option", json!(option)), ("allowed", json!(allowed))],
    )
}

pub fn unable_to_read_corosync_config(path: &str, reason: &str) -> ReportItem {
    ReportItem::error(
        ReportCode::UnableToReadCorosyncConfig,
        [("path", json!(path)), ("reason", json!(reason))],
    )
}

pub fn corosync_config_distribution_started() -> ReportItem {
    ReportItem::info(
        ReportCode::CorosyncConfigDistributionStarted,
        Vec::<(String, Value)>::new(),
    )
}

pub fn corosync_config_accepted_by_node(node: &str) -> ReportItem {
    ReportItem::info(ReportCode::CorosyncConfigAcceptedByNode, node_attr(node))
}

pub fn node_corosync_conf_save_error(node: &str) -> ReportItem {
    ReportItem::error(ReportCode::NodeCorosyncConfSaveError, node_attr(node))
}

pub fn corosync_config_reloaded() -> ReportItem {
    ReportItem::info(ReportCode::CorosyncConfigReloaded, Vec::<(String, Value)>::new())
}

pub fn corosync_config_reload_error(reason: &str) -> ReportItem {
    ReportItem::error(ReportCode::CorosyncConfigReloadError, [("reason", json!(reason))])
}
