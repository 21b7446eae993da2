//! Collaborator interfaces
//!
//! Everything the engine does to the machine goes through these traits.
//! `asdomain-host` provides the Linux implementations; tests use recording
//! mocks.

use crate::error::Result;
use asdomain_core::{CommandLine, ServiceState};
use async_trait::async_trait;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity a process or file is owned by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAs {
    pub user: String,
    pub group: String,
}

impl RunAs {
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Ownership and permission bits applied to a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttrs {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,
}

impl FileAttrs {
    pub fn new(owner: impl Into<String>, group: impl Into<String>, mode: u32) -> Self {
        Self {
            owner: Some(owner.into()),
            group: Some(group.into()),
            mode: Some(mode),
        }
    }

    pub fn mode(mode: u32) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }
}

/// A system account to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub name: String,
    pub group: String,
    pub home: PathBuf,
    pub shell: String,
    pub comment: String,
    pub system: bool,
}

/// Runs external commands.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command`, optionally as another user, killing it after `timeout`.
    ///
    /// A non-zero exit is returned as output, not as an error. Exceeding the
    /// timeout is [`ConvergeError::Timeout`](crate::ConvergeError::Timeout).
    async fn run(
        &self,
        command: &CommandLine,
        run_as: Option<&RunAs>,
        timeout: Duration,
    ) -> Result<ProcessOutput>;
}

/// Filesystem access. Mutating methods return whether anything changed.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn write(&self, path: &Path, content: &[u8], attrs: &FileAttrs) -> Result<bool>;

    async fn copy(&self, from: &Path, to: &Path, attrs: &FileAttrs) -> Result<bool>;

    async fn create_dir(&self, path: &Path, attrs: &FileAttrs, recursive: bool) -> Result<bool>;

    /// Missing files are not an error.
    async fn remove_file(&self, path: &Path) -> Result<bool>;

    /// Missing directories are not an error.
    async fn remove_dir_all(&self, path: &Path) -> Result<bool>;
}

/// Controls OS services.
///
/// Operations on a service the manager does not know about fail with
/// [`ConvergeError::ServiceNotRegistered`](crate::ConvergeError::ServiceNotRegistered).
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn start(&self, name: &str) -> Result<()>;
    async fn stop(&self, name: &str) -> Result<()>;
    async fn restart(&self, name: &str) -> Result<()>;
    async fn enable(&self, name: &str) -> Result<()>;
    async fn disable(&self, name: &str) -> Result<()>;
    async fn status(&self, name: &str) -> Result<ServiceState>;
}

/// Writes credential files with restrictive permissions.
#[async_trait]
pub trait SecretFileWriter: Send + Sync {
    async fn write_secret(
        &self,
        path: &Path,
        content: &SecretString,
        attrs: &FileAttrs,
    ) -> Result<bool>;
}

/// Renders named templates.
pub trait TemplateRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    fn render(&self, name: &str, variables: &serde_json::Value) -> Result<String>;
}

/// Provisions groups and users; existing accounts are left alone.
#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn ensure_group(&self, name: &str) -> Result<bool>;

    async fn ensure_user(&self, account: &UserAccount) -> Result<bool>;
}

/// The set of collaborators a run works against
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub process: &'a dyn ProcessRunner,
    pub fs: &'a dyn FileSystem,
    pub services: &'a dyn ServiceManager,
    pub secrets: &'a dyn SecretFileWriter,
    pub templates: &'a dyn TemplateRenderer,
    pub accounts: &'a dyn AccountManager,
}
