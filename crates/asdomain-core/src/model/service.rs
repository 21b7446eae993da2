//! Service record: the OS service backing a domain

use super::domain::DomainSpec;
use super::install::InstallSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const SYSTEMD_UNIT_DIR: &str = "/lib/systemd/system";
pub const INIT_SCRIPT_DIR: &str = "/etc/init.d";

/// Maps a domain to its OS service name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
}

impl ServiceRecord {
    pub fn for_domain(spec: &DomainSpec, install: &InstallSettings) -> Self {
        Self {
            name: service_name(spec, install),
        }
    }

    /// Every location a unit for this service may have been written to.
    pub fn all_unit_paths(&self) -> [PathBuf; 2] {
        [init_script_path(&self.name), systemd_unit_path(&self.name)]
    }
}

/// `<prefix>-<domain_name>`
pub fn service_name(spec: &DomainSpec, install: &InstallSettings) -> String {
    format!("{}-{}", install.service_prefix, spec.domain_name)
}

pub fn systemd_unit_path(service: &str) -> PathBuf {
    PathBuf::from(SYSTEMD_UNIT_DIR).join(format!("{service}.service"))
}

pub fn init_script_path(service: &str) -> PathBuf {
    PathBuf::from(INIT_SCRIPT_DIR).join(service)
}

/// Observed lifecycle state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Absent,
    Stopped,
    Running,
    Enabled,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Absent => write!(f, "absent"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::Enabled => write!(f, "enabled"),
        }
    }
}
