//! install node

use super::{integer_arg, key, string_arg};
use crate::error::{CoreError, Result};
use crate::model::{InstallSettings, PlatformFamily, ProductVariant};
use kdl::KdlNode;
use std::path::PathBuf;

pub fn parse_install(node: &KdlNode) -> Result<InstallSettings> {
    let mut install = InstallSettings::default();

    let Some(children) = node.children() else {
        return Ok(install);
    };

    for child in children.nodes() {
        match key(child).as_str() {
            "install_dir" => install.install_dir = PathBuf::from(string_arg(child)?),
            "domains_dir" => install.domains_dir = PathBuf::from(string_arg(child)?),
            "version" => install.version = string_arg(child)?.parse()?,
            "variant" => {
                let value = string_arg(child)?;
                install.variant = ProductVariant::parse(&value).ok_or_else(|| {
                    CoreError::InvalidConfig(format!(
                        "unknown variant '{value}' (expected glassfish or payara)"
                    ))
                })?;
            }
            "user" => install.user = string_arg(child)?,
            "group" => install.group = string_arg(child)?,
            "asadmin_timeout" => install.asadmin_timeout = integer_arg(child)?,
            "platform_family" => {
                install.platform_family = Some(PlatformFamily::parse(&string_arg(child)?))
            }
            "templates_dir" => install.templates_dir = Some(PathBuf::from(string_arg(child)?)),
            "service_prefix" => install.service_prefix = string_arg(child)?,
            "admin_host" => install.admin_host = Some(string_arg(child)?),
            other => {
                tracing::warn!(key = %other, "Unknown install setting ignored");
            }
        }
    }

    Ok(install)
}
