use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "domain configuration not found. Looked in:\n\
        - current directory: domain.local.kdl, .domain.local.kdl, domain.kdl, .domain.kdl\n\
        - ./.asdomain/\n\
        - ~/.config/asdomain/domain.kdl\n\
        - /etc/asdomain/domain.kdl\n\
        Set ASDOMAIN_CONFIG_PATH or pass --config to use another file"
    )]
    DomainFileNotFound,

    #[error("config file does not exist: {0}")]
    ExplicitPathMissing(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
