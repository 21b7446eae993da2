//! domain node

use super::{bool_arg, first_arg, integer_arg, key, string_arg, string_map};
use crate::error::{CoreError, Result};
use crate::model::{DomainSpec, IiopListener, InstallSettings};
use kdl::KdlNode;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::warn;

pub fn parse_domain(node: &KdlNode, install: &InstallSettings) -> Result<DomainSpec> {
    let name = first_arg(node)
        .and_then(|v| v.as_string())
        .ok_or_else(|| CoreError::InvalidConfig("domain requires a name".to_string()))?;

    let mut spec = DomainSpec::new(name, install);
    let mut explicit_ports = false;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match key(child).as_str() {
                "port" => {
                    spec.port = integer_arg(child)?;
                    explicit_ports = true;
                }
                "admin_port" => {
                    spec.admin_port = integer_arg(child)?;
                    explicit_ports = true;
                }
                "https_port" => spec.https_port = integer_arg(child)?,
                "portbase" => spec.portbase = Some(integer_arg(child)?),
                "username" => spec.username = Some(string_arg(child)?),
                "password" => spec.password = Some(SecretString::new(string_arg(child)?)),
                "master_password" => {
                    spec.master_password = Some(SecretString::new(string_arg(child)?))
                }
                "password_file" => spec.password_file = Some(PathBuf::from(string_arg(child)?)),
                "certificate_cn" => spec.certificate_cn = Some(string_arg(child)?),
                "secure" => spec.secure = bool_arg(child)?,
                "system_user" => spec.system_user = string_arg(child)?,
                "system_group" => spec.system_group = string_arg(child)?,
                "systemd_enabled" => spec.systemd_enabled = bool_arg(child)?,
                "systemd_start_timeout" => spec.systemd_start_timeout = integer_arg(child)?,
                "systemd_stop_timeout" => spec.systemd_stop_timeout = integer_arg(child)?,
                "logging_properties" => spec.logging_properties = string_map(child)?,
                "realm_types" => spec.realm_types = string_map(child)?,
                "iiop_listener" => spec.iiop_listeners.push(parse_iiop_listener(child)?),
                other => {
                    warn!(domain = %spec.domain_name, key = %other, "Unknown domain setting ignored");
                }
            }
        }
    }

    if explicit_ports && spec.portbase.is_some() {
        warn!(
            domain = %spec.domain_name,
            "portbase is set; port and admin-port are only used for privilege checks"
        );
    }

    spec.validate()?;
    Ok(spec)
}

fn parse_iiop_listener(node: &KdlNode) -> Result<IiopListener> {
    let id = first_arg(node)
        .and_then(|v| v.as_string())
        .ok_or_else(|| CoreError::InvalidConfig("iiop-listener requires an id".to_string()))?;

    let mut listener = IiopListener::new(id);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match key(child).as_str() {
                "target" => listener.target = string_arg(child)?,
                "listener_address" | "address" => listener.listener_address = string_arg(child)?,
                "port" | "iiop_port" => listener.port = integer_arg(child)?,
                "security_enabled" => listener.security_enabled = bool_arg(child)?,
                "enabled" => listener.enabled = bool_arg(child)?,
                "properties" => listener.properties = string_map(child)?,
                other => {
                    warn!(listener = %listener.id, key = %other, "Unknown iiop-listener setting ignored");
                }
            }
        }
    }

    Ok(listener)
}
