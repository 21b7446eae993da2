//! Domain definition

use super::install::InstallSettings;
use crate::error::{CoreError, Result};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ADMIN_PORT: u16 = 4848;
pub const DEFAULT_HTTPS_PORT: u16 = 8181;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_SYSTEMD_TIMEOUT_SECS: u32 = 90;
pub const DEFAULT_IIOP_PORT: u16 = 1072;

/// Declarative description of one domain
///
/// KDL:
/// ```kdl
/// domain "sales" {
///     port 80
///     admin-port 4848
///     master-password "supersecret"
///     password-file "/srv/glassfish/.sales_passwd"
///     systemd-enabled #true
///     logging-properties {
///         ".level" "INFO"
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DomainSpec {
    pub domain_name: String,
    pub port: u16,
    pub admin_port: u16,
    pub https_port: u16,
    /// When set, all other ports are derived from this base by asadmin.
    pub portbase: Option<u16>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub master_password: Option<SecretString>,
    pub password_file: Option<PathBuf>,
    pub certificate_cn: Option<String>,
    /// Use TLS for remote administration
    pub secure: bool,
    pub system_user: String,
    pub system_group: String,
    pub systemd_enabled: bool,
    pub systemd_start_timeout: u32,
    pub systemd_stop_timeout: u32,
    pub logging_properties: BTreeMap<String, String>,
    pub realm_types: BTreeMap<String, String>,
    pub iiop_listeners: Vec<IiopListener>,
    pub domain_dir_path: PathBuf,
}

impl DomainSpec {
    /// A spec with defaults taken from the install settings.
    pub fn new(domain_name: impl Into<String>, install: &InstallSettings) -> Self {
        let domain_name = domain_name.into();
        Self {
            domain_dir_path: install.domains_dir.join(&domain_name),
            domain_name,
            port: DEFAULT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            https_port: DEFAULT_HTTPS_PORT,
            portbase: None,
            username: Some(DEFAULT_USERNAME.to_string()),
            password: None,
            master_password: None,
            password_file: None,
            certificate_cn: None,
            secure: false,
            system_user: install.user.clone(),
            system_group: install.group.clone(),
            systemd_enabled: false,
            systemd_start_timeout: DEFAULT_SYSTEMD_TIMEOUT_SECS,
            systemd_stop_timeout: DEFAULT_SYSTEMD_TIMEOUT_SECS,
            logging_properties: BTreeMap::new(),
            realm_types: BTreeMap::new(),
            iiop_listeners: Vec::new(),
        }
    }

    /// Structural checks that do not involve secrets.
    pub fn validate(&self) -> Result<()> {
        let name = &self.domain_name;
        if name.is_empty() {
            return Err(CoreError::InvalidConfig(
                "domain name must not be empty".to_string(),
            ));
        }
        if name.contains('/') || name.chars().any(char::is_whitespace) || name == "." || name == ".." {
            return Err(CoreError::InvalidConfig(format!(
                "domain name '{name}' must not contain '/' or whitespace"
            )));
        }
        for (label, port) in [
            ("port", self.port),
            ("admin_port", self.admin_port),
            ("https_port", self.https_port),
        ] {
            if port == 0 {
                return Err(CoreError::InvalidConfig(format!(
                    "domain '{name}': {label} must not be 0"
                )));
            }
        }
        if self.portbase == Some(0) {
            return Err(CoreError::InvalidConfig(format!(
                "domain '{name}': portbase must not be 0"
            )));
        }
        if self.system_user.is_empty() || self.system_group.is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "domain '{name}': system_user and system_group must not be empty"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for listener in &self.iiop_listeners {
            if !seen.insert(listener.id.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "domain '{name}': duplicate iiop-listener '{}'",
                    listener.id
                )));
            }
        }
        Ok(())
    }

    pub fn config_dir(&self) -> PathBuf {
        self.domain_dir_path.join("config")
    }

    pub fn docroot_dir(&self) -> PathBuf {
        self.domain_dir_path.join("docroot")
    }

    /// `<domain_dir>/bin/<domain_name>_asadmin`
    pub fn launcher_path(&self) -> PathBuf {
        self.domain_dir_path
            .join("bin")
            .join(format!("{}_asadmin", self.domain_name))
    }
}

/// IIOP listener declared inside a domain block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IiopListener {
    pub id: String,
    pub target: String,
    /// IP address or resolvable hostname
    pub listener_address: String,
    pub port: u16,
    pub security_enabled: bool,
    pub enabled: bool,
    pub properties: BTreeMap<String, String>,
}

impl IiopListener {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: "server".to_string(),
            listener_address: "0.0.0.0".to_string(),
            port: DEFAULT_IIOP_PORT,
            security_enabled: false,
            enabled: true,
            properties: BTreeMap::new(),
        }
    }
}
