//! Service manager
//!
//! Drives `systemctl` on systemd hosts and `service` plus the distro's
//! runlevel tool elsewhere.

use asdomain_converge::{ConvergeError, ProcessOutput, ProcessRunner, Result};
use asdomain_core::{CommandLine, PlatformFamily, ServiceState};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const SYSTEMD_RUNTIME_DIR: &str = "/run/systemd/system";
const SERVICE_TIMEOUT: Duration = Duration::from_secs(300);

/// systemctl: unit not found / not loaded
const SYSTEMCTL_NO_SUCH_UNIT: i32 = 5;
/// `systemctl is-active` for an unknown unit
const SYSTEMCTL_STATUS_UNKNOWN: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceBackend {
    Systemctl,
    SysV(PlatformFamily),
}

impl ServiceBackend {
    pub fn detect(family: &PlatformFamily) -> Self {
        if Path::new(SYSTEMD_RUNTIME_DIR).is_dir() {
            ServiceBackend::Systemctl
        } else {
            ServiceBackend::SysV(family.clone())
        }
    }
}

pub struct LocalServiceManager<R> {
    backend: ServiceBackend,
    runner: R,
}

impl<R: ProcessRunner> LocalServiceManager<R> {
    pub fn new(backend: ServiceBackend, runner: R) -> Self {
        Self { backend, runner }
    }

    async fn exec(&self, command: CommandLine) -> Result<ProcessOutput> {
        self.runner.run(&command, None, SERVICE_TIMEOUT).await
    }

    async fn control(&self, name: &str, operation: &str) -> Result<()> {
        let output = match &self.backend {
            ServiceBackend::Systemctl => {
                if matches!(operation, "start" | "restart" | "enable") {
                    self.exec(CommandLine::new("systemctl").arg("daemon-reload"))
                        .await?;
                }
                self.exec(CommandLine::new("systemctl").args([operation, name]))
                    .await?
            }
            ServiceBackend::SysV(family) => match operation {
                "enable" | "disable" => self.exec(runlevel_command(family, name, operation)).await?,
                _ => {
                    self.exec(CommandLine::new("service").args([name, operation]))
                        .await?
                }
            },
        };
        check(name, operation, output)
    }
}

fn runlevel_command(family: &PlatformFamily, name: &str, operation: &str) -> CommandLine {
    let enable = operation == "enable";
    match family {
        PlatformFamily::Rhel => {
            CommandLine::new("chkconfig").args([name, if enable { "on" } else { "off" }])
        }
        _ => CommandLine::new("update-rc.d").args([name, if enable { "defaults" } else { "disable" }]),
    }
}

fn not_registered(output: &ProcessOutput) -> bool {
    if output.status == SYSTEMCTL_NO_SUCH_UNIT {
        return true;
    }
    let stderr = output.stderr.to_lowercase();
    ["not loaded", "does not exist", "not found", "unrecognized service"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

fn check(name: &str, operation: &str, output: ProcessOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    if not_registered(&output) {
        return Err(ConvergeError::ServiceNotRegistered(name.to_string()));
    }
    Err(ConvergeError::Service {
        name: name.to_string(),
        operation: operation.to_string(),
        message: output.stderr.trim().to_string(),
    })
}

#[async_trait]
impl<R: ProcessRunner> asdomain_converge::ServiceManager for LocalServiceManager<R> {
    async fn start(&self, name: &str) -> Result<()> {
        self.control(name, "start").await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.control(name, "stop").await
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.control(name, "restart").await
    }

    async fn enable(&self, name: &str) -> Result<()> {
        self.control(name, "enable").await
    }

    async fn disable(&self, name: &str) -> Result<()> {
        self.control(name, "disable").await
    }

    async fn status(&self, name: &str) -> Result<ServiceState> {
        match &self.backend {
            ServiceBackend::Systemctl => {
                let active = self
                    .exec(CommandLine::new("systemctl").args(["is-active", name]))
                    .await?;
                if active.success() {
                    return Ok(ServiceState::Running);
                }
                let enabled = self
                    .exec(CommandLine::new("systemctl").args(["is-enabled", name]))
                    .await?;
                classify_systemctl(name, &active, &enabled)
            }
            ServiceBackend::SysV(_) => {
                let output = self
                    .exec(CommandLine::new("service").args([name, "status"]))
                    .await?;
                if output.success() {
                    Ok(ServiceState::Running)
                } else if not_registered(&output) {
                    Err(ConvergeError::ServiceNotRegistered(name.to_string()))
                } else {
                    Ok(ServiceState::Stopped)
                }
            }
        }
    }
}

/// State from inactive `is-active` output and `is-enabled` output.
fn classify_systemctl(
    name: &str,
    active: &ProcessOutput,
    enabled: &ProcessOutput,
) -> Result<ServiceState> {
    let enabled_state = enabled.stdout.trim();
    if enabled_state == "not-found"
        || (active.status == SYSTEMCTL_STATUS_UNKNOWN && !enabled.success())
        || not_registered(enabled)
    {
        return Err(ConvergeError::ServiceNotRegistered(name.to_string()));
    }
    Ok(if enabled.success() {
        ServiceState::Enabled
    } else {
        ServiceState::Stopped
    })
}
