//! Convergence error types

use asdomain_core::CoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvergeError {
    /// Rejected before anything touched the host.
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("command failed with exit status {status}: {command}\n{stderr}")]
    Process {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("command timed out after {}s: {command}", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("IO error: {path}\nreason: {message}")]
    Io { path: PathBuf, message: String },

    #[error("template error: {name}\nreason: {message}")]
    Template { name: String, message: String },

    /// The service manager does not know this service.
    #[error("service not registered: {0}")]
    ServiceNotRegistered(String),

    #[error("service '{name}' {operation} failed: {message}")]
    Service {
        name: String,
        operation: String,
        message: String,
    },

    #[error("account error: {0}")]
    Account(String),

    #[error("notification target not found: {0}")]
    UnknownNotificationTarget(String),
}

impl ConvergeError {
    pub fn io(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        ConvergeError::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, ConvergeError::Config(e) if e.is_config_error())
    }
}

pub type Result<T> = std::result::Result<T, ConvergeError>;
