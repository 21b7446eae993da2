//! Group and user provisioning via shadow-utils

use crate::ids::{group_exists, user_exists};
use asdomain_converge::{AccountManager, ConvergeError, ProcessRunner, Result, UserAccount};
use asdomain_core::CommandLine;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

const ACCOUNT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct LocalAccountManager<R> {
    runner: R,
}

impl<R: ProcessRunner> LocalAccountManager<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn exec(&self, command: CommandLine) -> Result<()> {
        let output = self.runner.run(&command, None, ACCOUNT_TIMEOUT).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ConvergeError::Account(format!(
                "{} exited with {}: {}",
                command,
                output.status,
                output.stderr.trim()
            )))
        }
    }
}

pub fn groupadd_command(name: &str) -> CommandLine {
    CommandLine::new("groupadd").args(["--system", name])
}

pub fn useradd_command(account: &UserAccount) -> CommandLine {
    let mut command = CommandLine::new("useradd");
    if account.system {
        command = command.arg("--system");
    }
    command
        .arg("--gid")
        .arg(account.group.as_str())
        .arg("--home-dir")
        .arg(account.home.display().to_string())
        .arg("--shell")
        .arg(account.shell.as_str())
        .arg("--comment")
        .arg(account.comment.as_str())
        .arg(account.name.as_str())
}

#[async_trait]
impl<R: ProcessRunner> AccountManager for LocalAccountManager<R> {
    async fn ensure_group(&self, name: &str) -> Result<bool> {
        if group_exists(name) {
            return Ok(false);
        }
        self.exec(groupadd_command(name)).await?;
        info!(group = %name, "Created group");
        Ok(true)
    }

    async fn ensure_user(&self, account: &UserAccount) -> Result<bool> {
        if user_exists(&account.name) {
            return Ok(false);
        }
        self.exec(useradd_command(account)).await?;
        info!(user = %account.name, "Created user");
        Ok(true)
    }
}
