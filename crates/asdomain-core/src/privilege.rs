//! Low-port delegation and run-as account policy

use crate::model::{DomainSpec, InstallSettings};
use std::path::PathBuf;

/// Ports below this need elevated bind privileges.
pub const PRIVILEGED_PORT_LIMIT: u16 = 1024;

/// Prefix that lets a non-root user bind privileged ports.
pub const DELEGATION_PROGRAM: &str = "authbind";
pub const DELEGATION_ARGS: &[&str] = &["--deep"];
pub const DELEGATION_BINARY: &str = "/usr/bin/authbind";

pub const AUTHBIND_BYPORT_DIR: &str = "/etc/authbind/byport";
pub const DELEGATION_GRANT_MODE: u32 = 0o550;

pub fn needs_privileged_bind(port: u16) -> bool {
    port < PRIVILEGED_PORT_LIMIT
}

/// Privileged ports among port, admin_port and https_port, without duplicates.
pub fn privileged_ports(spec: &DomainSpec) -> Vec<u16> {
    let mut ports = Vec::new();
    for port in [spec.port, spec.admin_port, spec.https_port] {
        if needs_privileged_bind(port) && !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}

pub fn requires_delegation(spec: &DomainSpec) -> bool {
    !privileged_ports(spec).is_empty()
}

/// Grant file that authorises the run-as user to bind `port`.
pub fn delegation_grant_path(port: u16) -> PathBuf {
    PathBuf::from(AUTHBIND_BYPORT_DIR).join(port.to_string())
}

pub fn group_needs_creation(spec: &DomainSpec, install: &InstallSettings) -> bool {
    spec.system_group != install.group
}

pub fn user_needs_creation(spec: &DomainSpec, install: &InstallSettings) -> bool {
    spec.system_user != install.user && spec.system_user != "root"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(port: u16, admin_port: u16, https_port: u16) -> DomainSpec {
        let mut spec = DomainSpec::new("sales", &InstallSettings::default());
        spec.port = port;
        spec.admin_port = admin_port;
        spec.https_port = https_port;
        spec
    }

    #[test]
    fn test_privileged_boundary() {
        assert!(needs_privileged_bind(80));
        assert!(needs_privileged_bind(1023));
        assert!(!needs_privileged_bind(1024));
        assert!(!needs_privileged_bind(8080));
    }

    #[test]
    fn test_requires_delegation_for_any_low_port() {
        assert!(!requires_delegation(&spec(8080, 4848, 8181)));
        assert!(requires_delegation(&spec(80, 4848, 8181)));
        assert!(requires_delegation(&spec(8080, 848, 8181)));
        assert!(requires_delegation(&spec(8080, 4848, 443)));
    }

    #[test]
    fn test_privileged_ports_deduplicated() {
        assert_eq!(privileged_ports(&spec(80, 80, 443)), vec![80, 443]);
        assert_eq!(
            delegation_grant_path(80),
            PathBuf::from("/etc/authbind/byport/80")
        );
    }

    #[test]
    fn test_account_creation_policy() {
        let install = InstallSettings::default();
        let mut spec = DomainSpec::new("sales", &install);
        assert!(!user_needs_creation(&spec, &install));
        assert!(!group_needs_creation(&spec, &install));

        spec.system_user = "root".to_string();
        assert!(!user_needs_creation(&spec, &install));

        spec.system_user = "sales".to_string();
        spec.system_group = "sales".to_string();
        assert!(user_needs_creation(&spec, &install));
        assert!(group_needs_creation(&spec, &install));
    }
}
