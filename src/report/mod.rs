//! Structured Reports
//!
//! Every user-visible outcome (errors, warnings, progress) is a [`ReportItem`]:
//! a severity, a machine-readable code and an attribute map. Items are batched
//! into [`crate::Error::Library`] on failure or handed to a [`ReportSink`].

pub mod reports;
mod sink;

pub use sink::{ReportSink, TracingReportSink};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a report item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
            Severity::Debug => write!(f, "DEBUG"),
        }
    }
}

macro_rules! report_codes {
    ($($variant:ident => $name:literal,)+) => {
        /// Machine-readable report codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum ReportCode {
            $($variant,)+
        }

        impl ReportCode {
            /// Wire name of the code
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ReportCode::$variant => $name,)+
                }
            }
        }
    };
}

report_codes! {
    ParseErrorCorosyncConfMissingClosingBrace => "PARSE_ERROR_COROSYNC_CONF_MISSING_CLOSING_BRACE",
    ParseErrorCorosyncConfUnexpectedClosingBrace => "PARSE_ERROR_COROSYNC_CONF_UNEXPECTED_CLOSING_BRACE",
    InvalidOption => "INVALID_OPTION",
    InvalidOptionValue => "INVALID_OPTION_VALUE",
    NodeCommunicationError => "NODE_COMMUNICATION_ERROR",
    NodeCommunicationErrorUnableToConnect => "NODE_COMMUNICATION_ERROR_UNABLE_TO_CONNECT",
    InvalidResponseFormat => "INVALID_RESPONSE_FORMAT",
    SbdNotInstalled => "SBD_NOT_INSTALLED",
    WatchdogNotFound => "WATCHDOG_NOT_FOUND",
    SbdDeviceDoesNotExist => "SBD_DEVICE_DOES_NOT_EXIST",
    SbdDeviceIsNotBlockDevice => "SBD_DEVICE_IS_NOT_BLOCK_DEVICE",
    SbdCheckStarted => "SBD_CHECK_STARTED",
    SbdCheckSuccess => "SBD_CHECK_SUCCESS",
    SbdConfigDistributionStarted => "SBD_CONFIG_DISTRIBUTION_STARTED",
    SbdConfigAcceptedByNode => "SBD_CONFIG_ACCEPTED_BY_NODE",
    SbdEnablingStarted => "SBD_ENABLING_STARTED",
    SbdDisablingStarted => "SBD_DISABLING_STARTED",
    SbdRequiresAtb => "SBD_REQUIRES_ATB",
    ServiceEnableSuccess => "SERVICE_ENABLE_SUCCESS",
    ServiceDisableSuccess => "SERVICE_DISABLE_SUCCESS",
    SbdDeviceInitializationStarted => "SBD_DEVICE_INITIALIZATION_STARTED",
    SbdDeviceInitializationSuccess => "SBD_DEVICE_INITIALIZATION_SUCCESS",
    SbdDeviceInitializationError => "SBD_DEVICE_INITIALIZATION_ERROR",
    SbdDeviceListError => "SBD_DEVICE_LIST_ERROR",
    SbdDeviceDumpError => "SBD_DEVICE_DUMP_ERROR",
    SbdDeviceMessageError => "SBD_DEVICE_MESSAGE_ERROR",
    UnableToGetSbdConfig => "UNABLE_TO_GET_SBD_CONFIG",
    UnableToGetSbdStatus => "UNABLE_TO_GET_SBD_STATUS",
    InvalidWatchdogNode => "INVALID_WATCHDOG_NODE",
    UnsupportedSbdOption => "UNSUPPORTED_SBD_OPTION",
    UnableToReadCorosyncConfig => "UNABLE_TO_READ_COROSYNC_CONFIG",
    CorosyncConfigDistributionStarted => "COROSYNC_CONFIG_DISTRIBUTION_STARTED",
    CorosyncConfigAcceptedByNode => "COROSYNC_CONFIG_ACCEPTED_BY_NODE",
    NodeCorosyncConfSaveError => "NODE_COROSYNC_CONF_SAVE_ERROR",
    CorosyncConfigReloaded => "COROSYNC_CONFIG_RELOADED",
    CorosyncConfigReloadError => "COROSYNC_CONFIG_RELOAD_ERROR",
}

impl ReportCode {
    /// Codes raised when a node could not be talked to at all
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            ReportCode::NodeCommunicationError | ReportCode::NodeCommunicationErrorUnableToConnect
        )
    }
}

impl fmt::Display for ReportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
    pub severity: Severity,
    pub code: ReportCode,
    #[serde(default)]
    pub info: BTreeMap<String, Value>,
}

impl ReportItem {
    /// Create a report item with the given attributes
    pub fn new<I, K>(severity: Severity, code: ReportCode, info: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            severity,
            code,
            info: info.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn error<I, K>(code: ReportCode, info: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::new(Severity::Error, code, info)
    }

    pub fn warning<I, K>(code: ReportCode, info: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::new(Severity::Warning, code, info)
    }

    pub fn info<I, K>(code: ReportCode, info: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::new(Severity::Info, code, info)
    }

    /// Whether this item represents a failure
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// String attribute lookup
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.info.get(key).and_then(Value::as_str)
    }

    /// The node this item is attributed to, if any
    pub fn node(&self) -> Option<&str> {
        self.attr("node")
    }

    /// Same item with the severity replaced
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for ReportItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity, self.code)?;
        if !self.info.is_empty() {
            let attrs: Vec<String> = self
                .info
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{key}={s}"),
                    other => format!("{key}={other}"),
                })
                .collect();
            write!(f, " ({})", attrs.join(", "))?;
        }
        Ok(())
    }
}
