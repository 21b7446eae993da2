//! KDL parser
//!
//! Parses asadmin domain configuration files. The `install` node is read
//! first so that domain defaults can be derived from it regardless of the
//! order nodes appear in.

mod domain;
mod install;

use domain::parse_domain;
use install::parse_install;

use crate::error::{CoreError, Result};
use crate::model::{InstallSettings, Manifest};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parse a KDL configuration file
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_kdl_string(&content)
}

/// Parse a KDL configuration string
pub fn parse_kdl_string(content: &str) -> Result<Manifest> {
    let doc: KdlDocument = content.parse()?;

    let mut install_nodes = doc.nodes().iter().filter(|n| n.name().value() == "install");
    let install = match install_nodes.next() {
        Some(node) => parse_install(node)?,
        None => InstallSettings::default(),
    };
    if install_nodes.next().is_some() {
        return Err(CoreError::InvalidConfig(
            "only one install node is allowed".to_string(),
        ));
    }

    let mut domains = BTreeMap::new();
    for node in doc.nodes() {
        match node.name().value() {
            "install" => {}
            "domain" => {
                let spec = parse_domain(node, &install)?;
                if domains.contains_key(&spec.domain_name) {
                    return Err(CoreError::InvalidConfig(format!(
                        "domain '{}' is declared twice",
                        spec.domain_name
                    )));
                }
                domains.insert(spec.domain_name.clone(), spec);
            }
            other => {
                tracing::debug!(node = %other, "Skipping unknown node");
            }
        }
    }

    Ok(Manifest { install, domains })
}

/// Node name with `-` normalised to `_`.
fn key(node: &KdlNode) -> String {
    node.name().value().replace('-', "_")
}

/// First positional argument of a node
fn first_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn string_arg(node: &KdlNode) -> Result<String> {
    first_arg(node)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            CoreError::InvalidConfig(format!("{} expects a string", node.name().value()))
        })
}

fn bool_arg(node: &KdlNode) -> Result<bool> {
    first_arg(node).and_then(|v| v.as_bool()).ok_or_else(|| {
        CoreError::InvalidConfig(format!(
            "{} expects #true or #false",
            node.name().value()
        ))
    })
}

fn integer_arg<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    first_arg(node)
        .and_then(|v| v.as_integer())
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| {
            CoreError::InvalidConfig(format!(
                "{} expects an integer in range",
                node.name().value()
            ))
        })
}

/// Children of the form `key "value"` as a map.
fn string_map(node: &KdlNode) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = first_arg(child)
                .map(|v| match v.as_string() {
                    Some(s) => s.to_string(),
                    None => v.to_string(),
                })
                .unwrap_or_default();
            map.insert(child.name().value().to_string(), value);
        }
    }
    Ok(map)
}
