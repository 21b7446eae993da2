//! Service unit selection and parameterisation
//!
//! Pure: decides which unit template to use and what goes into it. Turning
//! the template into text is left to the template renderer.

use crate::asadmin::{Asadmin, domain_dir_args, password_file_flag};
use crate::model::{
    DomainSpec, InstallSettings, PlatformFamily, init_script_path, service_name,
    systemd_unit_path,
};
use crate::template;
use serde_json::json;
use std::path::PathBuf;

pub const SYSTEMD_UNIT_MODE: u32 = 0o644;
pub const INIT_SCRIPT_MODE: u32 = 0o744;

/// Which flavour of unit is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Systemd,
    SysVInit(PlatformFamily),
}

/// A unit ready to be rendered and written
#[derive(Debug, Clone)]
pub struct UnitContent {
    pub kind: UnitKind,
    pub path: PathBuf,
    pub mode: u32,
    pub template: &'static str,
    pub variables: serde_json::Value,
}

/// Result of unit selection
#[derive(Debug, Clone)]
pub enum UnitSelection {
    Unit(UnitContent),
    /// No legacy template exists for this platform family.
    Unavailable { family: PlatformFamily },
}

impl UnitSelection {
    pub fn unit(&self) -> Option<&UnitContent> {
        match self {
            UnitSelection::Unit(unit) => Some(unit),
            UnitSelection::Unavailable { .. } => None,
        }
    }
}

/// start/restart/stop command strings embedded in the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleCommands {
    pub start: String,
    pub restart: String,
    pub stop: String,
}

pub fn lifecycle_commands(spec: &DomainSpec, install: &InstallSettings) -> LifecycleCommands {
    let asadmin = Asadmin::new(install);
    let password_flag = password_file_flag(spec.password_file.as_deref());

    let build = |subcommand: &str, fixed: &[&str]| {
        let mut args: Vec<String> = password_flag.iter().cloned().collect();
        args.extend(fixed.iter().map(|s| s.to_string()));
        args.extend(domain_dir_args(install));
        args.push(spec.domain_name.clone());
        asadmin.command(subcommand, args).to_string()
    };

    LifecycleCommands {
        start: build(
            "start-domain",
            &["--verbose", "false", "--debug", "false", "--upgrade", "false"],
        ),
        restart: build("restart-domain", &[]),
        stop: build("stop-domain", &[]),
    }
}

/// Choose and parameterise the unit for a domain.
pub fn render_unit(
    platform_family: &PlatformFamily,
    systemd_enabled: bool,
    spec: &DomainSpec,
    install: &InstallSettings,
    delegation_required: bool,
) -> UnitSelection {
    let service = service_name(spec, install);
    let commands = lifecycle_commands(spec, install);

    let mut variables = json!({
        "service_name": service,
        "domain_name": spec.domain_name,
        "domain_dir": spec.domain_dir_path.display().to_string(),
        "user": spec.system_user,
        "group": spec.system_group,
        "start_command": commands.start,
        "restart_command": commands.restart,
        "stop_command": commands.stop,
        "authbind": delegation_required,
    });

    if systemd_enabled {
        variables["start_timeout"] = json!(spec.systemd_start_timeout);
        variables["stop_timeout"] = json!(spec.systemd_stop_timeout);
        return UnitSelection::Unit(UnitContent {
            kind: UnitKind::Systemd,
            path: systemd_unit_path(&service),
            mode: SYSTEMD_UNIT_MODE,
            template: template::SYSTEMD_UNIT,
            variables,
        });
    }

    let template = match platform_family {
        PlatformFamily::Debian => template::INIT_DEBIAN,
        PlatformFamily::Rhel => template::INIT_RHEL,
        PlatformFamily::Unknown(_) => {
            return UnitSelection::Unavailable {
                family: platform_family.clone(),
            };
        }
    };

    UnitSelection::Unit(UnitContent {
        kind: UnitKind::SysVInit(platform_family.clone()),
        path: init_script_path(&service),
        mode: INIT_SCRIPT_MODE,
        template,
        variables,
    })
}
