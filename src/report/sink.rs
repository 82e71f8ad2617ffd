//! Report sinks

use super::{ReportItem, Severity};

/// Destination for progress and diagnostic reports.
///
/// Sinks are shared across a workflow but never touched from per-node tasks;
/// fan-out results are reported once the whole fan-out has completed.
pub trait ReportSink: Send + Sync {
    /// Accept a single report item
    fn process(&self, item: ReportItem);

    /// Accept several report items in order
    fn process_all(&self, items: Vec<ReportItem>) {
        for item in items {
            self.process(item);
        }
    }
}

/// Sink that forwards every report to `tracing` at a matching level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn process(&self, item: ReportItem) {
        match item.severity {
            Severity::Error => tracing::error!(code = %item.code, "{}", item),
            Severity::Warning => tracing::warn!(code = %item.code, "{}", item),
            Severity::Info => tracing::info!(code = %item.code, "{}", item),
            Severity::Debug => tracing::debug!(code = %item.code, "{}", item),
        }
    }
}
