//! Host-wide installation settings

use super::version::ProductVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INSTALL_DIR: &str = "/usr/local/glassfish";
pub const DEFAULT_DOMAINS_DIR: &str = "/srv/glassfish";
pub const DEFAULT_VERSION: &str = "4.1.1";
pub const DEFAULT_USER: &str = "glassfish";
pub const DEFAULT_GROUP: &str = "glassfish-admin";
pub const DEFAULT_SERVICE_PREFIX: &str = "glassfish";
pub const DEFAULT_ASADMIN_TIMEOUT_SECS: u64 = 150;

/// Extra time granted to the process runner on top of asadmin's own timeout,
/// so that asadmin's failure is observed instead of ours.
pub const PROCESS_GRACE_SECS: u64 = 5;

/// Settings shared by every domain on the host
///
/// KDL:
/// ```kdl
/// install {
///     install-dir "/usr/local/glassfish"
///     domains-dir "/srv/glassfish"
///     version "4.1.152"
///     variant "payara"
///     user "glassfish"
///     group "glassfish-admin"
///     asadmin-timeout 150
///     platform-family "debian"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub install_dir: PathBuf,
    pub domains_dir: PathBuf,
    pub version: ProductVersion,
    pub variant: ProductVariant,
    pub user: String,
    pub group: String,
    /// asadmin's own timeout in seconds
    pub asadmin_timeout: u64,
    /// `None` means detect from the host at startup.
    pub platform_family: Option<PlatformFamily>,
    /// Directory with additional templates (e.g. `default-web-<version>.xml`)
    pub templates_dir: Option<PathBuf>,
    pub service_prefix: String,
    /// Host used by the launcher script for remote administration
    pub admin_host: Option<String>,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            domains_dir: PathBuf::from(DEFAULT_DOMAINS_DIR),
            version: ProductVersion::new(4, 1, Some(1)),
            variant: ProductVariant::Glassfish,
            user: DEFAULT_USER.to_string(),
            group: DEFAULT_GROUP.to_string(),
            asadmin_timeout: DEFAULT_ASADMIN_TIMEOUT_SECS,
            platform_family: None,
            templates_dir: None,
            service_prefix: DEFAULT_SERVICE_PREFIX.to_string(),
            admin_host: None,
        }
    }
}

impl InstallSettings {
    /// Path to the asadmin script
    pub fn asadmin_script(&self) -> PathBuf {
        self.install_dir.join("glassfish").join("bin").join("asadmin")
    }

    /// Timeout for sub-processes that call asadmin.
    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.asadmin_timeout + PROCESS_GRACE_SECS)
    }
}

/// Product flavour installed on the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductVariant {
    #[default]
    Glassfish,
    Payara,
}

impl ProductVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "glassfish" => Some(Self::Glassfish),
            "payara" => Some(Self::Payara),
            _ => None,
        }
    }

    /// Payara ships its own default-web.xml.
    pub fn ships_default_web_config(&self) -> bool {
        matches!(self, Self::Payara)
    }
}

impl fmt::Display for ProductVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glassfish => write!(f, "glassfish"),
            Self::Payara => write!(f, "payara"),
        }
    }
}

/// OS family, used to pick the legacy init script flavour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformFamily {
    Debian,
    Rhel,
    Unknown(String),
}

impl PlatformFamily {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debian" | "ubuntu" | "linuxmint" => Self::Debian,
            "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "amazon" | "ol" => Self::Rhel,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Derive the family from `/etc/os-release` `ID` and `ID_LIKE` values.
    pub fn from_os_release(id: &str, id_like: Option<&str>) -> Self {
        let direct = Self::parse(id);
        if !matches!(direct, Self::Unknown(_)) {
            return direct;
        }
        for candidate in id_like.unwrap_or_default().split_whitespace() {
            let family = Self::parse(candidate);
            if !matches!(family, Self::Unknown(_)) {
                return family;
            }
        }
        direct
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debian => write!(f, "debian"),
            Self::Rhel => write!(f, "rhel"),
            Self::Unknown(name) => write!(f, "unknown ({name})"),
        }
    }
}
