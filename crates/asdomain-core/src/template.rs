//! Template rendering
//!
//! Built-in templates are compiled into the binary; an optional directory of
//! extra templates (vendor files such as `default-web-<version>.xml`) can be
//! layered on top with [`TemplateProcessor::add_template_dir`].

use crate::error::{CoreError, Result};
use crate::model::ProductVersion;
use std::collections::BTreeMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

pub const SYSTEMD_UNIT: &str = "systemd.service";
pub const INIT_DEBIAN: &str = "init.d.debian";
pub const INIT_RHEL: &str = "init.d.rhel";
pub const LOGGING_PROPERTIES: &str = "logging.properties";
pub const LOGIN_CONF: &str = "login.conf";
pub const LAUNCHER: &str = "asadmin-launcher.sh";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        SYSTEMD_UNIT,
        include_str!("../templates/systemd.service.tera"),
    ),
    (INIT_DEBIAN, include_str!("../templates/init.d.debian.tera")),
    (INIT_RHEL, include_str!("../templates/init.d.rhel.tera")),
    (
        LOGGING_PROPERTIES,
        include_str!("../templates/logging.properties.tera"),
    ),
    (LOGIN_CONF, include_str!("../templates/login.conf.tera")),
    (
        LAUNCHER,
        include_str!("../templates/asadmin-launcher.sh.tera"),
    ),
];

/// Name of the vendor default-web.xml template for a version.
pub fn default_web_template(version: &ProductVersion) -> String {
    format!("default-web-{version}.xml")
}

/// Template processor
pub struct TemplateProcessor {
    tera: Tera,
}

impl TemplateProcessor {
    /// Processor with the built-in templates registered.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())
            .map_err(|e| CoreError::TemplateError {
                name: "builtin".to_string(),
                message: extract_tera_error_detail(&e),
            })?;
        Ok(Self { tera })
    }

    /// Register every file in `dir` as a template named after its file name.
    #[tracing::instrument(skip(self))]
    pub fn add_template_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoError {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let name = name.trim_end_matches(".tera").to_string();
            self.tera
                .add_template_file(&path, Some(&name))
                .map_err(|e| CoreError::TemplateError {
                    name: name.clone(),
                    message: extract_tera_error_detail(&e),
                })?;
            debug!(template = %name, "Registered template");
            count += 1;
        }
        Ok(count)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a registered template with a JSON object as context.
    pub fn render(&self, name: &str, variables: &serde_json::Value) -> Result<String> {
        let context = Context::from_value(variables.clone()).map_err(|e| {
            CoreError::TemplateError {
                name: name.to_string(),
                message: extract_tera_error_detail(&e),
            }
        })?;
        self.tera
            .render(name, &context)
            .map_err(|e| CoreError::TemplateError {
                name: name.to_string(),
                message: extract_tera_error_detail(&e),
            })
    }
}

/// Walk the error chain; Tera's top-level message rarely says what went wrong.
fn extract_tera_error_detail(error: &tera::Error) -> String {
    use std::error::Error;

    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// Logging properties written when the domain does not override them.
pub fn default_logging_properties() -> BTreeMap<String, String> {
    [
        ("handlers", "java.util.logging.ConsoleHandler"),
        (
            "java.util.logging.ConsoleHandler.formatter",
            "com.sun.enterprise.server.logging.UniformLogFormatter",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.file",
            "${com.sun.aas.instanceRoot}/logs/server.log",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.rotationTimelimitInMinutes",
            "0",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.flushFrequency",
            "1",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.logtoConsole",
            "false",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.rotationLimitInBytes",
            "2000000",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.maxHistoryFiles",
            "3",
        ),
        (
            "com.sun.enterprise.server.logging.GFFileHandler.rotationOnDateChange",
            "false",
        ),
        ("java.util.logging.FileHandler.limit", "50000"),
        (".level", "INFO"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Login modules for the realms every domain ships with.
pub fn default_realm_confs() -> BTreeMap<String, String> {
    [
        (
            "fileRealm",
            "com.sun.enterprise.security.auth.login.FileLoginModule",
        ),
        (
            "ldapRealm",
            "com.sun.enterprise.security.auth.login.LDAPLoginModule",
        ),
        (
            "solarisRealm",
            "com.sun.enterprise.security.auth.login.SolarisLoginModule",
        ),
        (
            "jdbcRealm",
            "com.sun.enterprise.security.ee.auth.login.JDBCLoginModule",
        ),
        (
            "jdbcDigestRealm",
            "com.sun.enterprise.security.ee.auth.login.JDBCDigestLoginModule",
        ),
        (
            "pamRealm",
            "com.sun.enterprise.security.ee.auth.login.PamLoginModule",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `defaults` overlaid with `overrides`.
pub fn merged(
    defaults: BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut result = defaults;
    result.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    result
}
