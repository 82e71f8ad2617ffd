//! Test Doubles
//!
//! In-memory implementations of the external contracts ([`CommandRunner`],
//! [`NodeCommunicator`], [`ReportSink`]) with call recording.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::external::{CommandOutput, CommandRunner, NodeCommunicationError, NodeCommunicator, RequestData};
use crate::node::NodeAddresses;
use crate::report::{ReportCode, ReportItem, ReportSink, Severity};

/// A call received by [`FakeNodeCommunicator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub node: String,
    pub request: String,
    pub data: Option<RequestData>,
}

impl RecordedCall {
    /// Value of a request parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type ScriptedReply = std::result::Result<String, NodeCommunicationError>;

/// Scripted node communicator.
///
/// Replies are keyed by node label and request name; unscripted calls
/// succeed with an empty body.
#[derive(Debug, Default)]
pub struct FakeNodeCommunicator {
    replies: HashMap<(String, String), ScriptedReply>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeNodeCommunicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, node: &str, request: &str, body: impl Into<String>) -> Self {
        self.replies
            .insert((node.to_string(), request.to_string()), Ok(body.into()));
        self
    }

    pub fn with_failure(mut self, node: &str, request: &str, error: NodeCommunicationError) -> Self {
        self.replies
            .insert((node.to_string(), request.to_string()), Err(error));
        self
    }

    /// Delay every reply from `node`
    pub fn with_delay(mut self, node: &str, delay: Duration) -> Self {
        self.delays.insert(node.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Recorded calls of one request type
    pub fn calls_for(&self, request: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.request == request)
            .collect()
    }
}

#[async_trait::async_trait]
impl NodeCommunicator for FakeNodeCommunicator {
    async fn call_node(
        &self,
        node: &NodeAddresses,
        request: &str,
        data: Option<RequestData>,
    ) -> std::result::Result<String, NodeCommunicationError> {
        let label = node.label().to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                node: label.clone(),
                request: request.to_string(),
                data,
            });
        }

        if let Some(delay) = self.delays.get(&label) {
            tokio::time::sleep(*delay).await;
        }

        self.replies
            .get(&(label, request.to_string()))
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Scripted command runner.
///
/// Outputs are keyed by the full command line joined with spaces;
/// unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeCommandRunner {
    outputs: HashMap<String, CommandOutput>,
    errors: HashMap<String, String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, command: &[&str], output: CommandOutput) -> Self {
        self.outputs.insert(command.join(" "), output);
        self
    }

    /// Make `command` fail to run at all
    pub fn with_error(mut self, command: &[&str], reason: &str) -> Self {
        self.errors.insert(command.join(" "), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }
        let command = args.join(" ");
        if let Some(reason) = self.errors.get(&command) {
            return Err(Error::Command {
                command,
                reason: reason.clone(),
            });
        }
        Ok(self
            .outputs
            .get(&args.join(" "))
            .cloned()
            .unwrap_or_default())
    }
}

/// Report sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    items: Mutex<Vec<ReportItem>>,
}

impl CollectingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<ReportItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }
}

impl ReportSink for CollectingReportSink {
    fn process(&self, item: ReportItem) {
        if let Ok(mut items) = self.items.lock() {
            items.push(item);
        }
    }
}

/// Compare report items against `(severity, code, info)` triples, in order
pub fn assert_report_items(actual: &[ReportItem], expected: &[(Severity, ReportCode, Value)]) {
    let actual: Vec<(Severity, ReportCode, Value)> = actual
        .iter()
        .map(|item| {
            let info = serde_json::to_value(&item.info).unwrap_or(Value::Null);
            (item.severity, item.code, info)
        })
        .collect();
    assert_eq!(actual, expected, "report items differ");
}
