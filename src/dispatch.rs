//! Parallel Node Dispatch
//!
//! Runs one operation against many nodes with bounded concurrency. Every
//! node gets its own outcome slot; a failing node never stops the others
//! from running or from being recorded.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::stream::{self, StreamExt};
use futures::FutureExt;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::node::NodeAddresses;
use crate::report::{reports, ReportItem};

/// Result of an operation on a single node; failures carry their reports
pub type NodeResult<T> = std::result::Result<T, Vec<ReportItem>>;

/// Outcome recorded for one node
#[derive(Debug, Clone)]
pub struct NodeOutcome<T> {
    pub node: NodeAddresses,
    pub result: NodeResult<T>,
}

/// Outcomes of a completed fan-out, in the order targets were given
#[derive(Debug, Clone)]
pub struct DispatchOutcome<T> {
    outcomes: Vec<NodeOutcome<T>>,
}

impl<T> DispatchOutcome<T> {
    pub fn outcomes(&self) -> &[NodeOutcome<T>] {
        &self.outcomes
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Outcome for the node with the given label
    pub fn get(&self, label: &str) -> Option<&NodeResult<T>> {
        self.outcomes
            .iter()
            .find(|o| o.node.label() == label)
            .map(|o| &o.result)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&NodeAddresses, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|value| (&o.node, value)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&NodeAddresses, &[ReportItem])> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Err(items) => Some((&o.node, items.as_slice())),
            Ok(_) => None,
        })
    }

    /// Labels of nodes that failed
    pub fn failed_nodes(&self) -> Vec<&str> {
        self.failures().map(|(node, _)| node.label()).collect()
    }

    /// Every failure report, grouped by node in target order
    pub fn failure_items(&self) -> Vec<ReportItem> {
        self.failures()
            .flat_map(|(_, items)| items.iter().cloned())
            .collect()
    }

    /// Results keyed by node label, or one composite error holding the
    /// reports of every failed node
    pub fn into_result(self) -> Result<BTreeMap<String, T>> {
        if !self.is_success() {
            return Err(Error::library(self.failure_items()));
        }
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|o| match o.result {
                Ok(value) => Some((o.node.label().to_string(), value)),
                Err(_) => None,
            })
            .collect())
    }

    /// Successful results in target order, or one composite error holding
    /// the reports of every failed node
    pub fn into_successes(self) -> Result<Vec<(NodeAddresses, T)>> {
        if !self.is_success() {
            return Err(Error::library(self.failure_items()));
        }
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|o| o.result.ok().map(|value| (o.node, value)))
            .collect())
    }

    pub fn into_outcomes(self) -> Vec<NodeOutcome<T>> {
        self.outcomes
    }
}

/// Bounded-concurrency fan-out over cluster nodes.
///
/// Each call completes fully (success, application error or transport
/// error); timeouts are the transport's job and arrive as ordinary failures.
/// A panicking operation becomes a failure of its own node only. Operations
/// must not block the thread, all of them are polled from the caller's task.
#[derive(Debug, Clone)]
pub struct ParallelDispatcher {
    /// Maximum number of in-flight node operations
    max_workers: usize,
}

impl Default for ParallelDispatcher {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl ParallelDispatcher {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `operation` once per target and wait for all of them
    pub async fn run<A, T, F, Fut>(&self, targets: Vec<(NodeAddresses, A)>, operation: F) -> DispatchOutcome<T>
    where
        F: Fn(NodeAddresses, A) -> Fut,
        Fut: Future<Output = NodeResult<T>>,
    {
        if targets.is_empty() {
            return DispatchOutcome { outcomes: Vec::new() };
        }

        tracing::debug!(
            nodes = targets.len(),
            workers = self.max_workers,
            "Dispatching operation to nodes"
        );

        let operation = &operation;
        let mut indexed: Vec<(usize, NodeOutcome<T>)> = stream::iter(targets.into_iter().enumerate())
            .map(move |(index, (node, arg))| async move {
                let target = node.clone();
                let call = AssertUnwindSafe(async move { operation(target, arg).await }).catch_unwind();
                let result = match call.await {
                    Ok(Err(items)) if items.is_empty() => Err(vec![reports::node_communication_error(
                        node.label(),
                        "",
                        "operation failed without details",
                    )]),
                    Ok(other) => other,
                    Err(panic) => Err(vec![reports::node_communication_error(
                        node.label(),
                        "",
                        &panic_reason(panic.as_ref()),
                    )]),
                };
                if let Err(items) = &result {
                    tracing::warn!(node = %node, failures = items.len(), "Node operation failed");
                }
                (index, NodeOutcome { node, result })
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<_> = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        tracing::debug!(
            failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
            "Dispatch finished"
        );
        DispatchOutcome { outcomes }
    }

    /// Run `operation` once per target; fail with every node's reports if
    /// any node failed
    pub async fn run_and_raise<A, T, F, Fut>(
        &self,
        targets: Vec<(NodeAddresses, A)>,
        operation: F,
    ) -> Result<BTreeMap<String, T>>
    where
        F: Fn(NodeAddresses, A) -> Fut,
        Fut: Future<Output = NodeResult<T>>,
    {
        self.run(targets, operation).await.into_result()
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    let message = panic
        .downcast_ref::<&str>()
        .map(|m| m.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("operation panicked: {message}")
}

/// Pair every node with a unit argument
pub fn bare_targets(nodes: &[NodeAddresses]) -> Vec<(NodeAddresses, ())> {
    nodes.iter().cloned().map(|node| (node, ())).collect()
}
