//! Host error types

use asdomain_converge::ConvergeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {path}\nreason: {message}")]
    Io { path: PathBuf, message: String },

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },
}

impl HostError {
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        HostError::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

impl From<HostError> for ConvergeError {
    fn from(error: HostError) -> Self {
        match error {
            HostError::Io { path, message } => ConvergeError::Io { path, message },
            HostError::UnknownUser(_) | HostError::UnknownGroup(_) => {
                ConvergeError::Account(error.to_string())
            }
            HostError::Spawn { program, message } => ConvergeError::Io {
                path: PathBuf::from(program),
                message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
