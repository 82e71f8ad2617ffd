//! SBD configuration file
//!
//! Generation of the per-node environment file, parsing it back, and
//! validation of user-supplied SBD options.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::report::{reports, ReportItem, Severity};

/// Key/value content of an SBD environment file
pub type SbdConfig = BTreeMap<String, String>;

pub const SBD_CONFIG_HEADER: &str = "# This file has been generated by wolfquorum.\n";

/// Options a user may set directly
pub const ALLOWED_SBD_OPTIONS: &[&str] = &["SBD_DELAY_START", "SBD_STARTMODE", "SBD_WATCHDOG_TIMEOUT"];

/// Options derived from other inputs and never accepted from the user
pub const MANAGED_SBD_OPTIONS: &[&str] = &["SBD_WATCHDOG_DEV", "SBD_OPTS", "SBD_DEVICE", "SBD_PACEMAKER"];

/// Render the SBD config for one node.
///
/// Keys are written in sorted order after a fixed header. `SBD_DEVICE` is
/// present only when `devices` is non-empty.
pub fn create_sbd_config(base: &SbdConfig, node_label: &str, watchdog: &str, devices: &[String]) -> String {
    let mut config = base.clone();
    config.insert("SBD_WATCHDOG_DEV".into(), watchdog.to_string());
    config.insert("SBD_OPTS".into(), format!("\"-n {}\"", node_label));
    if devices.is_empty() {
        config.remove("SBD_DEVICE");
    } else {
        config.insert("SBD_DEVICE".into(), format!("\"{}\"", devices.join(";")));
    }

    let mut text = String::from(SBD_CONFIG_HEADER);
    for (key, value) in &config {
        text.push_str(key);
        text.push('=');
        text.push_str(value);
        text.push('\n');
    }
    text
}

/// Parse environment-file text; comments and lines without `=` are skipped,
/// matching surrounding quotes are removed
pub fn parse_sbd_config(text: &str) -> SbdConfig {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), strip_quotes(value.trim()).to_string()))
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Split an `SBD_DEVICE` value into device paths
pub fn parse_device_list(value: &str) -> Vec<String> {
    strip_quotes(value.trim())
        .split(';')
        .map(str::trim)
        .filter(|device| !device.is_empty())
        .map(String::from)
        .collect()
}

/// Devices configured in the local SBD config; a missing file means none
pub fn local_sbd_device_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        reports::unable_to_get_sbd_config("local node", &e.to_string()).with_severity(Severity::Error)
    })?;
    Ok(parse_sbd_config(&content)
        .get("SBD_DEVICE")
        .map(|value| parse_device_list(value))
        .unwrap_or_default())
}

/// Validate user options; every problem is reported, in option-name order.
///
/// Unknown options are errors unless `allow_unknown` turns them into
/// warnings. Managed options are always errors.
pub fn validate_sbd_options(options: &SbdConfig, allow_unknown: bool) -> Vec<ReportItem> {
    options
        .keys()
        .filter(|name| !ALLOWED_SBD_OPTIONS.contains(&name.as_str()))
        .map(|name| {
            let item = reports::unsupported_sbd_option(name, ALLOWED_SBD_OPTIONS);
            if allow_unknown && !MANAGED_SBD_OPTIONS.contains(&name.as_str()) {
                item.with_severity(Severity::Warning)
            } else {
                item
            }
        })
        .collect()
}
