//! Local SBD commands
//!
//! Wrappers around the `sbd` tool and the service manager, run through the
//! environment's [`CommandRunner`](crate::external::CommandRunner).

use std::collections::BTreeMap;
use std::path::Path;

use crate::consistency::SbdPosture;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::external::CommandOutput;
use crate::report::reports;

use super::config::local_sbd_device_list;

/// Device options accepted by `initialize_block_devices` and their flags
pub const DEVICE_INIT_OPTIONS: &[(&str, &str)] = &[
    ("allocate-timeout", "-2"),
    ("loop-timeout", "-3"),
    ("msgwait-timeout", "-4"),
    ("watchdog-timeout", "-1"),
];

pub fn sbd_service_name(use_systemd: bool) -> &'static str {
    if use_systemd {
        "sbd"
    } else {
        "sbd_helper"
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn run(env: &Environment, args: Vec<String>) -> Result<CommandOutput> {
    tracing::debug!(command = %args.join(" "), "Running local command");
    env.runner().run(&args).await
}

fn sbd_device_command(env: &Environment, device: &str, rest: &[&str]) -> Vec<String> {
    let mut args = vec![path_arg(&env.settings().binaries.sbd), "-d".to_string(), device.to_string()];
    args.extend(rest.iter().map(|arg| arg.to_string()));
    args
}

/// Service names known to the local service manager
async fn installed_services(env: &Environment) -> Result<Vec<String>> {
    let settings = env.settings();
    let output = if settings.service.use_systemd {
        run(
            env,
            vec![
                path_arg(&settings.binaries.systemctl),
                "list-unit-files".into(),
                "--full".into(),
            ],
        )
        .await?
    } else {
        run(env, vec![path_arg(&settings.binaries.chkconfig)]).await?
    };

    if !output.success() {
        return Ok(Vec::new());
    }
    Ok(output
        .stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.strip_suffix(".service").unwrap_or(name).to_string())
        .collect())
}

pub async fn is_sbd_installed(env: &Environment) -> Result<bool> {
    let service = env.settings().sbd_service_name();
    Ok(installed_services(env).await?.iter().any(|name| name == service))
}

pub async fn is_sbd_enabled(env: &Environment) -> Result<bool> {
    let settings = env.settings();
    let service = settings.sbd_service_name();
    let args = if settings.service.use_systemd {
        vec![
            path_arg(&settings.binaries.systemctl),
            "is-enabled".into(),
            format!("{service}.service"),
        ]
    } else {
        vec![path_arg(&settings.binaries.chkconfig), service.to_string()]
    };
    Ok(run(env, args).await?.success())
}

/// Write SBD headers to `devices`.
///
/// `options` keys are the names in [`DEVICE_INIT_OPTIONS`]; flags are emitted
/// in option-name order.
pub async fn initialize_block_devices(
    env: &Environment,
    devices: &[String],
    options: &BTreeMap<String, String>,
) -> Result<()> {
    let allowed: Vec<&str> = DEVICE_INIT_OPTIONS.iter().map(|(name, _)| *name).collect();
    let unknown: Vec<_> = options
        .keys()
        .filter(|name| !allowed.contains(&name.as_str()))
        .map(|name| reports::invalid_option(name, &allowed, "sbd device"))
        .collect();
    if !unknown.is_empty() {
        return Err(Error::library(unknown));
    }

    env.report(reports::sbd_device_initialization_started(devices));

    let mut args = vec![path_arg(&env.settings().binaries.sbd)];
    for device in devices {
        args.push("-d".into());
        args.push(device.clone());
    }
    for (name, value) in options {
        if let Some((_, flag)) = DEVICE_INIT_OPTIONS.iter().find(|(option, _)| *option == name.as_str()) {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }
    args.push("create".into());

    let output = run(env, args).await?;
    if !output.success() {
        return Err(reports::sbd_device_initialization_error(devices, &output.joined_output()).into());
    }
    env.report(reports::sbd_device_initialization_success(devices));
    Ok(())
}

/// Messages stored in the slots of `device`
pub async fn device_messages_info(env: &Environment, device: &str) -> Result<String> {
    let output = run(env, sbd_device_command(env, device, &["list"])).await?;
    if !output.success() {
        return Err(reports::sbd_device_list_error(device, &output.joined_output()).into());
    }
    Ok(output.stdout)
}

/// Header of `device`
pub async fn device_header_dump(env: &Environment, device: &str) -> Result<String> {
    let output = run(env, sbd_device_command(env, device, &["dump"])).await?;
    if !output.success() {
        return Err(reports::sbd_device_dump_error(device, &output.joined_output()).into());
    }
    Ok(output.stdout)
}

/// Write `message` into the slot of `node` on `device`
pub async fn set_message(env: &Environment, device: &str, node: &str, message: &str) -> Result<()> {
    let output = run(env, sbd_device_command(env, device, &["message", node, message])).await?;
    if !output.success() {
        return Err(reports::sbd_device_message_error(device, node, message, &output.joined_output()).into());
    }
    Ok(())
}

/// SBD posture of the local node
#[derive(Debug, Clone, Copy)]
pub struct LocalSbd<'a> {
    env: &'a Environment,
}

impl<'a> LocalSbd<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }
}

#[async_trait::async_trait]
impl<'a> SbdPosture for LocalSbd<'a> {
    async fn is_watchdog_only_sbd(&self) -> Result<bool> {
        if !is_sbd_installed(self.env).await? || !is_sbd_enabled(self.env).await? {
            return Ok(false);
        }
        let devices = local_sbd_device_list(&self.env.settings().paths.sbd_config)?;
        Ok(devices.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WolfQuorumConfig;
    use crate::report::{ReportCode, Severity};
    use crate::testing::{assert_report_items, CollectingReportSink, FakeCommandRunner, FakeNodeCommunicator};
    use serde_json::json;
    use std::sync::Arc;

    const LIST_UNITS: &[&str] = &["/usr/bin/systemctl", "list-unit-files", "--full"];
    const IS_ENABLED: &[&str] = &["/usr/bin/systemctl", "is-enabled", "sbd.service"];

    fn environment(
        settings: WolfQuorumConfig,
        runner: FakeCommandRunner,
    ) -> (Environment, Arc<FakeCommandRunner>, Arc<CollectingReportSink>) {
        let runner = Arc::new(runner);
        let sink = Arc::new(CollectingReportSink::new());
        let env = Environment::new(settings, runner.clone(), Arc::new(FakeNodeCommunicator::new()), sink.clone());
        (env, runner, sink)
    }

    fn units(installed: bool) -> CommandOutput {
        let mut stdout = String::from("UNIT FILE  STATE\ncorosync.service  enabled\n");
        if installed {
            stdout.push_str("sbd.service  disabled\n");
        }
        CommandOutput::new(stdout, "", 0)
    }

    #[test]
    fn test_service_name() {
        assert_eq!(sbd_service_name(true), "sbd");
        assert_eq!(sbd_service_name(false), "sbd_helper");
    }

    #[tokio::test]
    async fn test_installed_and_enabled_systemd() {
        let runner = FakeCommandRunner::new()
            .with_output(LIST_UNITS, units(true))
            .with_output(IS_ENABLED, CommandOutput::new("enabled", "", 0));
        let (env, _, _) = environment(WolfQuorumConfig::default(), runner);
        assert!(is_sbd_installed(&env).await.unwrap());
        assert!(is_sbd_enabled(&env).await.unwrap());

        let runner = FakeCommandRunner::new()
            .with_output(LIST_UNITS, units(false))
            .with_output(IS_ENABLED, CommandOutput::new("disabled", "", 1));
        let (env, _, _) = environment(WolfQuorumConfig::default(), runner);
        assert!(!is_sbd_installed(&env).await.unwrap());
        assert!(!is_sbd_enabled(&env).await.unwrap());
    }

    #[tokio::test]
    async fn test_installed_chkconfig() {
        let mut settings = WolfQuorumConfig::default();
        settings.service.use_systemd = false;
        let runner = FakeCommandRunner::new()
            .with_output(
                &["/sbin/chkconfig"],
                CommandOutput::new("corosync  0:off 1:off\nsbd_helper  0:off 1:on\n", "", 0),
            )
            .with_output(&["/sbin/chkconfig", "sbd_helper"], CommandOutput::new("", "", 0));
        let (env, runner, _) = environment(settings, runner);

        assert!(is_sbd_installed(&env).await.unwrap());
        assert!(is_sbd_enabled(&env).await.unwrap());
        assert_eq!(runner.calls()[1], vec!["/sbin/chkconfig", "sbd_helper"]);
    }

    #[tokio::test]
    async fn test_initialize_devices() {
        let (env, runner, sink) = environment(WolfQuorumConfig::default(), FakeCommandRunner::new());
        let devices = vec!["/dev/sdb".to_string(), "/dev/vda".to_string()];
        let options = BTreeMap::from([
            ("watchdog-timeout".to_string(), "10".to_string()),
            ("allocate-timeout".to_string(), "3".to_string()),
            ("msgwait-timeout".to_string(), "20".to_string()),
            ("loop-timeout".to_string(), "1".to_string()),
        ]);

        initialize_block_devices(&env, &devices, &options).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![vec![
                "/usr/sbin/sbd", "-d", "/dev/sdb", "-d", "/dev/vda", "-2", "3", "-3", "1", "-4", "20", "-1", "10",
                "create",
            ]]
        );
        assert_report_items(
            &sink.items(),
            &[
                (
                    Severity::Info,
                    ReportCode::SbdDeviceInitializationStarted,
                    json!({"device_list": ["/dev/sdb", "/dev/vda"]}),
                ),
                (
                    Severity::Info,
                    ReportCode::SbdDeviceInitializationSuccess,
                    json!({"device_list": ["/dev/sdb", "/dev/vda"]}),
                ),
            ],
        );
    }

    #[tokio::test]
    async fn test_initialize_devices_failure() {
        let runner = FakeCommandRunner::new().with_output(
            &["/usr/sbin/sbd", "-d", "/dev/sdb", "create"],
            CommandOutput::new("", "cannot open", 1),
        );
        let (env, _, sink) = environment(WolfQuorumConfig::default(), runner);
        let devices = vec!["/dev/sdb".to_string()];

        let err = initialize_block_devices(&env, &devices, &BTreeMap::new()).await.unwrap_err();
        assert_report_items(
            err.report_items(),
            &[(
                Severity::Error,
                ReportCode::SbdDeviceInitializationError,
                json!({"device_list": ["/dev/sdb"], "reason": "cannot open"}),
            )],
        );
        assert_eq!(sink.items().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_devices_unknown_option() {
        let (env, runner, _) = environment(WolfQuorumConfig::default(), FakeCommandRunner::new());
        let options = BTreeMap::from([("bogus".to_string(), "1".to_string())]);

        let err = initialize_block_devices(&env, &["/dev/sdb".to_string()], &options)
            .await
            .unwrap_err();
        assert_eq!(err.report_items()[0].code, ReportCode::InvalidOption);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_device_commands() {
        let runner = FakeCommandRunner::new()
            .with_output(&["/usr/sbin/sbd", "-d", "/dev/sdb", "list"], CommandOutput::new("0 node1 clear\n", "", 0))
            .with_output(&["/usr/sbin/sbd", "-d", "/dev/sdb", "dump"], CommandOutput::new("", "no header", 1))
            .with_output(
                &["/usr/sbin/sbd", "-d", "/dev/sdb", "message", "node1", "test"],
                CommandOutput::new("", "", 0),
            );
        let (env, _, _) = environment(WolfQuorumConfig::default(), runner);

        assert_eq!(device_messages_info(&env, "/dev/sdb").await.unwrap(), "0 node1 clear\n");

        let err = device_header_dump(&env, "/dev/sdb").await.unwrap_err();
        assert_eq!(err.report_items()[0].code, ReportCode::SbdDeviceDumpError);
        assert_eq!(err.report_items()[0].attr("reason"), Some("no header"));

        set_message(&env, "/dev/sdb", "node1", "test").await.unwrap();
    }

    #[tokio::test]
    async fn test_message_failure() {
        let runner = FakeCommandRunner::new().with_output(
            &["/usr/sbin/sbd", "-d", "/dev/sdb", "message", "node1", "off"],
            CommandOutput::new("out", "err", 1),
        );
        let (env, _, _) = environment(WolfQuorumConfig::default(), runner);

        let err = set_message(&env, "/dev/sdb", "node1", "off").await.unwrap_err();
        assert_report_items(
            err.report_items(),
            &[(
                Severity::Error,
                ReportCode::SbdDeviceMessageError,
                json!({"device": "/dev/sdb", "node": "node1", "message": "off", "reason": "err\nout"}),
            )],
        );
    }

    #[tokio::test]
    async fn test_watchdog_only_posture() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = WolfQuorumConfig::default();
        settings.paths.sbd_config = dir.path().join("sbd");

        let enabled = || {
            FakeCommandRunner::new()
                .with_output(LIST_UNITS, units(true))
                .with_output(IS_ENABLED, CommandOutput::new("enabled", "", 0))
        };

        let (env, _, _) = environment(settings.clone(), enabled());
        assert!(LocalSbd::new(&env).is_watchdog_only_sbd().await.unwrap());

        std::fs::write(&settings.paths.sbd_config, "SBD_DEVICE=\"/dev/sdb\"\n").unwrap();
        assert!(!LocalSbd::new(&env).is_watchdog_only_sbd().await.unwrap());

        let not_installed = FakeCommandRunner::new().with_output(LIST_UNITS, units(false));
        let (env, runner, _) = environment(settings, not_installed);
        assert!(!LocalSbd::new(&env).is_watchdog_only_sbd().await.unwrap());
        assert_eq!(runner.calls().len(), 1);
    }
}
