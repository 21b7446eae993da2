use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "The master_password parameter is unspecified and defaulting to the domain password. \
         Specify a master_password longer than {min} characters or increase the size of the \
         domain password to be longer than {min} characters."
    )]
    MasterPasswordUnspecified { min: usize },

    #[error("The master_password parameter must be longer than {min} characters.")]
    MasterPasswordTooShort { min: usize },

    #[error("invalid product version '{0}'")]
    InvalidVersion(String),

    #[error("template error: {name}\nreason: {message}")]
    TemplateError { name: String, message: String },

    #[error("domain not found: {0}")]
    DomainNotFound(String),
}

impl CoreError {
    /// True for errors that reject a spec before anything touches the host.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidConfig(_)
                | CoreError::MasterPasswordUnspecified { .. }
                | CoreError::MasterPasswordTooShort { .. }
                | CoreError::InvalidVersion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
