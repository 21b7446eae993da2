//! Process runner backed by tokio

use crate::error::HostError;
use crate::ids::{current_uid, gid_of, uid_of};
use asdomain_converge::{ConvergeError, ProcessOutput, ProcessRunner, Result, RunAs};
use asdomain_core::CommandLine;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: &CommandLine,
        run_as: Option<&RunAs>,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(run_as) = run_as {
            let uid = uid_of(&run_as.user)?;
            let gid = gid_of(&run_as.group)?;
            if uid != current_uid() {
                cmd.uid(uid).gid(gid);
            }
            tracing::debug!(user = %run_as.user, "Running: {}", command);
        } else {
            tracing::debug!("Running: {}", command);
        }

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(output) => output.map_err(|e| HostError::Spawn {
                program: command.program.clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                return Err(ConvergeError::Timeout {
                    command: command.to_string(),
                    timeout,
                });
            }
        };

        Ok(ProcessOutput {
            // Killed by a signal
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
