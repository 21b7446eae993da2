//! asdomain host
//!
//! Linux implementations of the collaborator traits the convergence engine
//! works against.

pub mod accounts;
pub mod error;
pub mod fs;
pub mod ids;
pub mod platform;
pub mod process;
pub mod secret;
pub mod services;
pub mod template;

pub use accounts::LocalAccountManager;
pub use error::HostError;
pub use fs::LocalFileSystem;
pub use platform::detect_platform_family;
pub use process::TokioProcessRunner;
pub use secret::LocalSecretWriter;
pub use services::{LocalServiceManager, ServiceBackend};
pub use template::TeraRenderer;

use asdomain_converge::{Host, Result};
use asdomain_core::{InstallSettings, PlatformFamily};

/// All collaborators for the local machine
pub struct LocalHost {
    process: TokioProcessRunner,
    fs: LocalFileSystem,
    services: LocalServiceManager<TokioProcessRunner>,
    secrets: LocalSecretWriter,
    templates: TeraRenderer,
    accounts: LocalAccountManager<TokioProcessRunner>,
}

impl LocalHost {
    pub fn new(install: &InstallSettings) -> Result<Self> {
        let family = install
            .platform_family
            .clone()
            .unwrap_or_else(|| PlatformFamily::Unknown("undetected".to_string()));
        Ok(Self {
            process: TokioProcessRunner::new(),
            fs: LocalFileSystem::new(),
            services: LocalServiceManager::new(
                ServiceBackend::detect(&family),
                TokioProcessRunner::new(),
            ),
            secrets: LocalSecretWriter::new(),
            templates: TeraRenderer::new(install)?,
            accounts: LocalAccountManager::new(TokioProcessRunner::new()),
        })
    }

    pub fn host(&self) -> Host<'_> {
        Host {
            process: &self.process,
            fs: &self.fs,
            services: &self.services,
            secrets: &self.secrets,
            templates: &self.templates,
            accounts: &self.accounts,
        }
    }
}
