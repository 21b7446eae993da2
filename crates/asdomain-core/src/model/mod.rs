//! Model definitions
//!
//! Data types describing the desired state of an application-server
//! installation and its domains.

mod domain;
mod install;
mod service;
mod version;

// Re-exports
pub use domain::*;
pub use install::*;
pub use service::*;
pub use version::*;

use std::collections::BTreeMap;

/// Everything declared in one configuration document
#[derive(Debug, Clone)]
pub struct Manifest {
    pub install: InstallSettings,
    pub domains: BTreeMap<String, DomainSpec>,
}

impl Manifest {
    pub fn domain(&self, name: &str) -> crate::error::Result<&DomainSpec> {
        self.domains
            .get(name)
            .ok_or_else(|| crate::error::CoreError::DomainNotFound(name.to_string()))
    }
}
