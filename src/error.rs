//! WolfQuorum Error Types

use thiserror::Error;

use crate::report::ReportItem;

/// Result type alias for WolfQuorum operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfQuorum error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// One or more structured report items describing why an operation failed.
    /// Items are batched: validation and fan-out collect every problem before
    /// failing.
    #[error("{}", render_items(.0))]
    Library(Vec<ReportItem>),

    // Process errors
    #[error("Command {command} failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Command {0} timed out")]
    CommandTimeout(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a library error from report items
    pub fn library<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ReportItem>,
    {
        Error::Library(items.into_iter().collect())
    }

    /// Structured report items carried by this error (empty for non-library errors)
    pub fn report_items(&self) -> &[ReportItem] {
        match self {
            Error::Library(items) => items,
            _ => &[],
        }
    }

    /// Check if this error was raised by a node-level transport failure
    pub fn is_communication_failure(&self) -> bool {
        self.report_items().iter().any(|item| item.code.is_communication())
    }
}

impl From<ReportItem> for Error {
    fn from(item: ReportItem) -> Self {
        Error::Library(vec![item])
    }
}

fn render_items(items: &[ReportItem]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
