//! Library Environment
//!
//! Bundles the settings and external collaborators a workflow needs. It is
//! passed explicitly to every operation; nothing here is global.

use std::sync::Arc;

use crate::config::WolfQuorumConfig;
use crate::dispatch::ParallelDispatcher;
use crate::external::{CommandRunner, NodeCommunicator, TokioCommandRunner};
use crate::report::{ReportItem, ReportSink, TracingReportSink};

/// Settings plus runner, communicator, report sink and dispatcher
#[derive(Clone)]
pub struct Environment {
    settings: WolfQuorumConfig,
    runner: Arc<dyn CommandRunner>,
    communicator: Arc<dyn NodeCommunicator>,
    reports: Arc<dyn ReportSink>,
    dispatcher: ParallelDispatcher,
}

impl Environment {
    pub fn new(
        settings: WolfQuorumConfig,
        runner: Arc<dyn CommandRunner>,
        communicator: Arc<dyn NodeCommunicator>,
        reports: Arc<dyn ReportSink>,
    ) -> Self {
        let dispatcher = ParallelDispatcher::from_config(&settings.dispatch);
        Self {
            settings,
            runner,
            communicator,
            reports,
            dispatcher,
        }
    }

    /// Environment running real local processes and logging reports
    /// through `tracing`
    pub fn from_config(settings: WolfQuorumConfig, communicator: Arc<dyn NodeCommunicator>) -> Self {
        let runner = Arc::new(TokioCommandRunner::new(settings.command_timeout()));
        Self::new(settings, runner, communicator, Arc::new(TracingReportSink))
    }

    pub fn with_dispatcher(mut self, dispatcher: ParallelDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn settings(&self) -> &WolfQuorumConfig {
        &self.settings
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        &*self.runner
    }

    pub fn communicator(&self) -> &dyn NodeCommunicator {
        &*self.communicator
    }

    pub fn dispatcher(&self) -> &ParallelDispatcher {
        &self.dispatcher
    }

    pub fn report(&self, item: ReportItem) {
        self.reports.process(item);
    }

    pub fn report_all(&self, items: Vec<ReportItem>) {
        self.reports.process_all(items);
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("settings", &self.settings)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::reports;
    use crate::testing::{CollectingReportSink, FakeCommandRunner, FakeNodeCommunicator};

    #[test]
    fn test_dispatcher_follows_settings() {
        let mut settings = WolfQuorumConfig::default();
        settings.dispatch.max_workers = 3;

        let env = Environment::new(
            settings,
            Arc::new(FakeCommandRunner::new()),
            Arc::new(FakeNodeCommunicator::new()),
            Arc::new(CollectingReportSink::new()),
        );
        assert_eq!(env.dispatcher().max_workers(), 3);

        let env = env.with_dispatcher(ParallelDispatcher::new(1));
        assert_eq!(env.dispatcher().max_workers(), 1);
    }

    #[test]
    fn test_reports_reach_sink() {
        let sink = Arc::new(CollectingReportSink::new());
        let env = Environment::new(
            WolfQuorumConfig::default(),
            Arc::new(FakeCommandRunner::new()),
            Arc::new(FakeNodeCommunicator::new()),
            sink.clone(),
        );

        env.report(reports::sbd_check_started());
        env.report_all(vec![reports::sbd_check_success("node1")]);
        assert_eq!(sink.items().len(), 2);
    }
}
