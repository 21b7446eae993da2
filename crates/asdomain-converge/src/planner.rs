//! Convergence planner
//!
//! Pure function from desired spec and observed host facts to an ordered,
//! guarded action plan. Nothing here touches the host.

use crate::action::{
    Action, ActionKind, ActionPlan, Condition, DomainState, NotifyTarget, ServiceOp, Timing,
};
use crate::error::Result;
use crate::host::{FileAttrs, RunAs, UserAccount};
use crate::observe::HostObservation;
use asdomain_core::asadmin::{
    create_domain_command, create_iiop_listener_command, launcher_command, list_domains_command,
    list_iiop_listeners_command,
};
use asdomain_core::model::CompatShim;
use asdomain_core::privilege::{self, DELEGATION_BINARY};
use asdomain_core::template::{self, default_web_template, merged};
use asdomain_core::unit::{UnitSelection, render_unit};
use asdomain_core::{DomainSpec, InstallSettings, PlatformFamily, secret, service_name};
use secrecy::SecretString;
use serde_json::json;

/// Action ids
pub mod ids {
    pub const DOMAINS_DIR: &str = "domains_dir";
    pub const PASSWORD_FILE: &str = "password_file";
    pub const DEFAULT_WEB_CONFIG: &str = "default_web_config";
    pub const DOCROOT_INDEX: &str = "docroot_index";
    pub const CREATE_DOMAIN: &str = "create_domain";
    pub const RELOCATE_MASTER_PASSWORD: &str = "relocate_master_password";
    pub const LOGGING_PROPERTIES: &str = "logging_properties";
    pub const LOGIN_CONF: &str = "login_conf";
    pub const LAUNCHER: &str = "launcher";
    pub const INIT_SCRIPT: &str = "init_script";
    pub const SYSTEMD_UNIT: &str = "systemd_unit";
    pub const SERVICE_ENABLE: &str = "service_enable";
    pub const SERVICE_START: &str = "service_start";
    pub const SERVICE_STOP: &str = "service_stop";
    pub const SERVICE_DISABLE: &str = "service_disable";
    pub const DOMAIN_DIR: &str = "domain_dir";

    pub fn group(name: &str) -> String {
        format!("group[{name}]")
    }

    pub fn user(name: &str) -> String {
        format!("user[{name}]")
    }

    pub fn delegation(port: u16) -> String {
        format!("authbind[{port}]")
    }

    pub fn directory(relative: &str) -> String {
        format!("directory[{relative}]")
    }

    pub fn iiop_listener(id: &str) -> String {
        format!("iiop_listener[{id}]")
    }
}

/// Subdirectories newer product releases expect even when empty.
pub const REQUIRED_DIRECTORIES: &[&str] = &["bin", "lib", "lib/ext"];

const SYSTEMD_SETTING: &str = "systemd_enabled";

const DIRECTORY_MODE: u32 = 0o755;
const SECRET_MODE: u32 = 0o600;
const CONFIG_MODE: u32 = 0o600;
const DEFAULT_WEB_MODE: u32 = 0o644;
const LAUNCHER_MODE: u32 = 0o700;

/// Build the plan that brings `spec` to its desired state.
///
/// Fails with a configuration error when the master password cannot be
/// resolved; callers rely on this happening before any host access.
pub fn converge(
    spec: &DomainSpec,
    install: &InstallSettings,
    observation: &HostObservation,
) -> Result<ActionPlan> {
    spec.validate()?;
    let master_password = secret::master_password_for(spec)?;

    let service = service_name(spec, install);
    let mut plan = ActionPlan::new(&spec.domain_name, &service);
    let run_as = RunAs::new(&spec.system_user, &spec.system_group);
    let owned = |mode| FileAttrs::new(&spec.system_user, &spec.system_group, mode);
    let restart_later = NotifyTarget::Service(ServiceOp::Restart);

    plan_accounts(&mut plan, spec, install);

    plan.push(Action::new(
        ids::DOMAINS_DIR,
        ActionKind::EnsureDirectory {
            path: install.domains_dir.clone(),
            attrs: FileAttrs::new(&install.user, &install.group, DIRECTORY_MODE),
            recursive: true,
        },
    ));

    plan_password_file(&mut plan, spec, &master_password);

    let delegation_required = privilege::requires_delegation(spec);
    for port in privilege::privileged_ports(spec) {
        plan.push(Action::new(
            ids::delegation(port),
            ActionKind::WriteFile {
                path: privilege::delegation_grant_path(port),
                content: String::new(),
                attrs: owned(privilege::DELEGATION_GRANT_MODE),
            },
        ));
    }
    if delegation_required && !observation.delegation_available {
        plan.warnings.push(format!(
            "privileged ports requested but {DELEGATION_BINARY} is not installed"
        ));
    }

    // Only ever run as a reaction to domain creation.
    let default_web = plan_default_web_config(&mut plan, spec, install, observation);
    plan.push(
        Action::new(
            ids::DOCROOT_INDEX,
            ActionKind::DeleteFile {
                path: spec.docroot_dir().join("index.html"),
            },
        )
        .on_notify(),
    );

    if !observation.domain_exists {
        let mut create = Action::new(
            ids::CREATE_DOMAIN,
            ActionKind::CreateDomain {
                command: create_domain_command(spec, install),
                run_as: run_as.clone(),
                timeout: install.process_timeout(),
            },
        )
        .not_if(Condition::Listed {
            command: list_domains_command(install),
            run_as: run_as.clone(),
            timeout: install.process_timeout(),
            needle: spec.domain_name.clone(),
        })
        .reaches(DomainState::CreatedNotConfigured);
        if default_web {
            create = create.notify(
                NotifyTarget::Action(ids::DEFAULT_WEB_CONFIG.to_string()),
                Timing::Immediate,
            );
        }
        create = create
            .notify(
                NotifyTarget::Action(ids::DOCROOT_INDEX.to_string()),
                Timing::Immediate,
            )
            .notify(NotifyTarget::Service(ServiceOp::Start), Timing::Delayed);
        plan.push(create);
    }

    for shim in install.version.compat_shims() {
        match shim {
            CompatShim::RelocateMasterPassword => {
                let source = spec.config_dir().join("master-password");
                let dest = spec.domain_dir_path.join("master-password");
                plan.push(
                    Action::new(
                        ids::RELOCATE_MASTER_PASSWORD,
                        ActionKind::CopyFile {
                            from: source.clone(),
                            to: dest.clone(),
                            attrs: FileAttrs {
                                owner: Some(spec.system_user.clone()),
                                group: Some(spec.system_group.clone()),
                                mode: None,
                            },
                        },
                    )
                    .only_if(Condition::FileExists(source))
                    .not_if(Condition::FileExists(dest)),
                );
            }
        }
    }

    plan.push(
        Action::new(
            ids::LOGGING_PROPERTIES,
            ActionKind::WriteTemplate {
                path: spec.config_dir().join("logging.properties"),
                template: template::LOGGING_PROPERTIES.to_string(),
                variables: json!({
                    "logging_properties": merged(
                        template::default_logging_properties(),
                        &spec.logging_properties,
                    ),
                }),
                attrs: owned(CONFIG_MODE),
            },
        )
        .notify(restart_later.clone(), Timing::Delayed),
    );

    plan.push(
        Action::new(
            ids::LOGIN_CONF,
            ActionKind::WriteTemplate {
                path: spec.config_dir().join("login.conf"),
                template: template::LOGIN_CONF.to_string(),
                variables: json!({
                    "realm_types": merged(template::default_realm_confs(), &spec.realm_types),
                }),
                attrs: owned(CONFIG_MODE),
            },
        )
        .notify(restart_later.clone(), Timing::Delayed),
    );

    for dir in REQUIRED_DIRECTORIES {
        plan.push(
            Action::new(
                ids::directory(dir),
                ActionKind::EnsureDirectory {
                    path: spec.domain_dir_path.join(dir),
                    attrs: owned(DIRECTORY_MODE),
                    recursive: false,
                },
            )
            .notify(restart_later.clone(), Timing::Delayed),
        );
    }

    plan.push(
        Action::new(
            ids::LAUNCHER,
            ActionKind::WriteTemplate {
                path: spec.launcher_path(),
                template: template::LAUNCHER.to_string(),
                variables: json!({ "command": launcher_command(spec, install).to_string() }),
                attrs: owned(LAUNCHER_MODE),
            },
        )
        .reaches(DomainState::Configured),
    );

    plan_units(&mut plan, spec, install, delegation_required);

    plan.push(
        Action::new(
            ids::SERVICE_ENABLE,
            ActionKind::Service {
                op: ServiceOp::Enable,
                name: service.clone(),
                tolerate_absent: false,
            },
        )
        .reaches(DomainState::ServiceRegistered),
    );

    if !spec.iiop_listeners.is_empty() {
        // Listeners are managed through the running admin server.
        plan.push(Action::new(
            ids::SERVICE_START,
            ActionKind::Service {
                op: ServiceOp::Start,
                name: service.clone(),
                tolerate_absent: false,
            },
        ));
        for listener in &spec.iiop_listeners {
            plan.push(
                Action::new(
                    ids::iiop_listener(&listener.id),
                    ActionKind::Execute {
                        command: create_iiop_listener_command(spec, install, listener),
                        run_as: run_as.clone(),
                        timeout: install.process_timeout(),
                    },
                )
                .not_if(Condition::Listed {
                    command: list_iiop_listeners_command(spec, install, &listener.target),
                    run_as: run_as.clone(),
                    timeout: install.process_timeout(),
                    needle: listener.id.clone(),
                }),
            );
        }
    }

    Ok(plan)
}

fn plan_accounts(plan: &mut ActionPlan, spec: &DomainSpec, install: &InstallSettings) {
    if privilege::group_needs_creation(spec, install) {
        plan.push(Action::new(
            ids::group(&spec.system_group),
            ActionKind::EnsureGroup {
                name: spec.system_group.clone(),
            },
        ));
    }
    if privilege::user_needs_creation(spec, install) {
        plan.push(Action::new(
            ids::user(&spec.system_user),
            ActionKind::EnsureUser(UserAccount {
                name: spec.system_user.clone(),
                group: spec.system_group.clone(),
                home: spec.domain_dir_path.clone(),
                shell: "/bin/bash".to_string(),
                comment: format!("GlassFish {} Domain", spec.domain_name),
                system: true,
            }),
        ));
    }
}

fn plan_password_file(plan: &mut ActionPlan, spec: &DomainSpec, master: &SecretString) {
    let (Some(path), Some(password)) = (&spec.password_file, &spec.password) else {
        return;
    };
    plan.push(Action::new(
        ids::PASSWORD_FILE,
        ActionKind::WriteSecret {
            path: path.clone(),
            content: secret::password_file_content(password, master),
            attrs: FileAttrs::new(&spec.system_user, &spec.system_group, SECRET_MODE),
        },
    ));
}

/// Returns whether a default web config action was planned.
fn plan_default_web_config(
    plan: &mut ActionPlan,
    spec: &DomainSpec,
    install: &InstallSettings,
    observation: &HostObservation,
) -> bool {
    if install.variant.ships_default_web_config() {
        return false;
    }
    let template_name = default_web_template(&install.version);
    if !observation.default_web_template {
        plan.warnings.push(format!(
            "template '{template_name}' not found; default-web.xml will not be written"
        ));
        return false;
    }
    plan.push(
        Action::new(
            ids::DEFAULT_WEB_CONFIG,
            ActionKind::WriteTemplate {
                path: spec.config_dir().join("default-web.xml"),
                template: template_name,
                variables: json!({ "domain_name": spec.domain_name }),
                attrs: FileAttrs::new(&install.user, &install.group, DEFAULT_WEB_MODE),
            },
        )
        .on_notify(),
    );
    true
}

/// Both unit variants are planned; guards make them mutually exclusive.
fn plan_units(
    plan: &mut ActionPlan,
    spec: &DomainSpec,
    install: &InstallSettings,
    delegation_required: bool,
) {
    let family = install
        .platform_family
        .clone()
        .unwrap_or_else(|| PlatformFamily::Unknown("undetected".to_string()));
    let systemd_on = Condition::Setting {
        name: SYSTEMD_SETTING,
        enabled: spec.systemd_enabled,
    };

    match render_unit(&family, false, spec, install, delegation_required) {
        UnitSelection::Unit(unit) => plan.push(
            Action::new(
                ids::INIT_SCRIPT,
                ActionKind::WriteTemplate {
                    path: unit.path,
                    template: unit.template.to_string(),
                    variables: unit.variables,
                    attrs: FileAttrs::mode(unit.mode),
                },
            )
            .not_if(systemd_on.clone())
            .notify(NotifyTarget::Service(ServiceOp::Restart), Timing::Delayed)
            .notify_unchanged(),
        ),
        UnitSelection::Unavailable { family } => {
            if !spec.systemd_enabled {
                plan.warnings.push(format!(
                    "no init script template for platform family {family}; \
                     enable systemd or set platform-family"
                ));
            }
        }
    }

    if let UnitSelection::Unit(unit) = render_unit(&family, true, spec, install, delegation_required)
    {
        plan.push(
            Action::new(
                ids::SYSTEMD_UNIT,
                ActionKind::WriteTemplate {
                    path: unit.path,
                    template: unit.template.to_string(),
                    variables: unit.variables,
                    attrs: FileAttrs::mode(unit.mode),
                },
            )
            .only_if(systemd_on)
            .notify(NotifyTarget::Service(ServiceOp::Restart), Timing::Delayed)
            .notify_unchanged(),
        );
    }
}
