//! WolfQuorum Configuration
//!
//! This module provides the settings every component receives explicitly:
//! binary locations, file paths, fan-out limits and logging options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main WolfQuorum configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WolfQuorumConfig {
    /// Locations of external binaries
    #[serde(default)]
    pub binaries: BinariesConfig,

    /// Locations of managed files
    #[serde(default)]
    pub paths: PathsConfig,

    /// Parallel node communication
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Service manager integration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External binary locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinariesConfig {
    /// SBD management tool
    #[serde(default = "default_sbd_binary")]
    pub sbd: PathBuf,

    /// systemd control tool
    #[serde(default = "default_systemctl_binary")]
    pub systemctl: PathBuf,

    /// SysV service tool
    #[serde(default = "default_chkconfig_binary")]
    pub chkconfig: PathBuf,

    /// Corosync runtime configuration tool
    #[serde(default = "default_corosync_cfgtool_binary")]
    pub corosync_cfgtool: PathBuf,
}

/// Managed file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// SBD environment file
    #[serde(default = "default_sbd_config_path")]
    pub sbd_config: PathBuf,

    /// Corosync configuration
    #[serde(default = "default_corosync_conf_path")]
    pub corosync_conf: PathBuf,
}

/// Fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of nodes contacted at the same time
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Timeout for local commands in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Service manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Use systemd (otherwise SysV init scripts)
    #[serde(default = "default_true")]
    pub use_systemd: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_sbd_binary() -> PathBuf {
    PathBuf::from("/usr/sbin/sbd")
}

fn default_systemctl_binary() -> PathBuf {
    PathBuf::from("/usr/bin/systemctl")
}

fn default_chkconfig_binary() -> PathBuf {
    PathBuf::from("/sbin/chkconfig")
}

fn default_corosync_cfgtool_binary() -> PathBuf {
    PathBuf::from("/usr/sbin/corosync-cfgtool")
}

fn default_sbd_config_path() -> PathBuf {
    PathBuf::from("/etc/sysconfig/sbd")
}

fn default_corosync_conf_path() -> PathBuf {
    PathBuf::from("/etc/corosync/corosync.conf")
}

fn default_max_workers() -> usize {
    8
}

fn default_command_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            sbd: default_sbd_binary(),
            systemctl: default_systemctl_binary(),
            chkconfig: default_chkconfig_binary(),
            corosync_cfgtool: default_corosync_cfgtool_binary(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sbd_config: default_sbd_config_path(),
            corosync_conf: default_corosync_conf_path(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            use_systemd: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WolfQuorumConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfQuorumConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.dispatch.max_workers == 0 {
            return Err(crate::Error::Config("dispatch.max_workers must be at least 1".into()));
        }

        if self.binaries.sbd.as_os_str().is_empty() {
            return Err(crate::Error::Config("binaries.sbd cannot be empty".into()));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "compact") {
            return Err(crate::Error::Config(format!(
                "logging.format must be 'pretty' or 'compact', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Get local command timeout as Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.command_timeout_secs)
    }

    /// Name of the SBD service for the configured service manager
    pub fn sbd_service_name(&self) -> &'static str {
        crate::sbd::local::sbd_service_name(self.service.use_systemd)
    }
}
