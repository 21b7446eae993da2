//! asadmin command lines
//!
//! Builds the argument vectors passed to the asadmin script. Commands are
//! kept as program + argv rather than shell strings; [`CommandLine`]'s
//! `Display` gives the shell form used in unit files and logs.

use crate::model::{DomainSpec, IiopListener, InstallSettings};
use crate::privilege::{self, DELEGATION_ARGS, DELEGATION_PROGRAM};
use std::fmt;
use std::path::Path;

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run this command through `program prefix_args...`.
    pub fn wrapped(self, program: &str, prefix_args: &[&str]) -> Self {
        let mut args: Vec<String> = prefix_args.iter().map(|a| a.to_string()).collect();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn contains_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Where a remote asadmin command connects to
#[derive(Debug, Clone, Default)]
pub struct RemoteTarget {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
}

/// asadmin invocation with its global options
#[derive(Debug, Clone)]
pub struct Asadmin {
    script: String,
    terse: bool,
    echo: bool,
    username: Option<String>,
    password_file: Option<String>,
    remote: Option<RemoteTarget>,
}

impl Asadmin {
    pub fn new(install: &InstallSettings) -> Self {
        Self {
            script: install.asadmin_script().display().to_string(),
            terse: false,
            echo: false,
            username: None,
            password_file: None,
            remote: None,
        }
    }

    /// asadmin authenticated with the domain's admin credentials.
    pub fn for_domain(install: &InstallSettings, spec: &DomainSpec) -> Self {
        let mut asadmin = Self::new(install);
        asadmin.username = spec.username.clone();
        asadmin.password_file = spec
            .password_file
            .as_ref()
            .map(|p| p.display().to_string());
        asadmin
    }

    pub fn terse(mut self, terse: bool) -> Self {
        self.terse = terse;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn remote(mut self, target: RemoteTarget) -> Self {
        self.remote = Some(target);
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.terse {
            args.push("--terse".to_string());
        }
        if self.echo {
            args.push("--echo".to_string());
        }
        if let Some(user) = &self.username {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        if let Some(file) = &self.password_file {
            args.push(format!("--passwordfile={file}"));
        }
        if let Some(remote) = &self.remote {
            if let Some(host) = &remote.host {
                args.push("--host".to_string());
                args.push(host.clone());
            }
            if remote.secure {
                args.push("--secure".to_string());
            }
            args.push("--port".to_string());
            args.push(remote.port.to_string());
        }
        args
    }

    /// `asadmin <global options> <subcommand> <args>`
    pub fn command<I, S>(&self, subcommand: &str, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(&self.script)
            .args(self.global_args())
            .arg(subcommand)
            .args(args)
    }
}

/// `--domaindir <domains_dir>`
pub fn domain_dir_args(install: &InstallSettings) -> [String; 2] {
    [
        "--domaindir".to_string(),
        install.domains_dir.display().to_string(),
    ]
}

/// Arguments for `create-domain`, domain name last.
pub fn create_domain_args(spec: &DomainSpec, install: &InstallSettings) -> Vec<String> {
    let mut args = vec![
        "--checkports=false".to_string(),
        "--savemasterpassword=true".to_string(),
    ];

    match spec.portbase {
        Some(portbase) => {
            args.push("--portbase".to_string());
            args.push(portbase.to_string());
        }
        None => {
            args.push("--instanceport".to_string());
            args.push(spec.port.to_string());
            args.push("--adminport".to_string());
            args.push(spec.admin_port.to_string());
        }
    }

    if spec.username.is_some() {
        args.push("--nopassword=false".to_string());
    }
    if let Some(cn) = &spec.certificate_cn {
        args.push("--keytooloptions".to_string());
        args.push(format!("CN={cn}"));
    }
    args.extend(domain_dir_args(install));
    args.push(spec.domain_name.clone());
    args
}

/// Full domain creation command, wrapped for low-port delegation when required.
pub fn create_domain_command(spec: &DomainSpec, install: &InstallSettings) -> CommandLine {
    let command =
        Asadmin::for_domain(install, spec).command("create-domain", create_domain_args(spec, install));
    if privilege::requires_delegation(spec) {
        command.wrapped(DELEGATION_PROGRAM, DELEGATION_ARGS)
    } else {
        command
    }
}

pub fn list_domains_command(install: &InstallSettings) -> CommandLine {
    Asadmin::new(install).command("list-domains", domain_dir_args(install))
}

/// Whether `list-domains` output lists `domain`.
///
/// Output lines look like `sales running` or `Name: sales Status: Running`.
/// Only the name position counts; the trailing `Command ...` status line is ignored.
pub fn domain_listed(output: &str, domain: &str) -> bool {
    output
        .lines()
        .filter(|line| !line.starts_with("Command "))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("Name:") => tokens.next(),
                first => first,
            }
        })
        .any(|name| name == domain)
}

/// Remote administration command used by the launcher script and the
/// post-start listener configuration.
pub fn remote_asadmin(spec: &DomainSpec, install: &InstallSettings) -> Asadmin {
    Asadmin::for_domain(install, spec).remote(RemoteTarget {
        host: install.admin_host.clone(),
        port: spec.admin_port,
        secure: spec.secure,
    })
}

/// Body of `<domain_dir>/bin/<domain_name>_asadmin`.
pub fn launcher_command(spec: &DomainSpec, install: &InstallSettings) -> CommandLine {
    remote_asadmin(spec, install)
        .terse(false)
        .echo(true)
        .command("\"$@\"", std::iter::empty::<String>())
}

pub fn list_iiop_listeners_command(
    spec: &DomainSpec,
    install: &InstallSettings,
    target: &str,
) -> CommandLine {
    remote_asadmin(spec, install)
        .terse(true)
        .command("list-iiop-listeners", [target.to_string()])
}

pub fn create_iiop_listener_command(
    spec: &DomainSpec,
    install: &InstallSettings,
    listener: &IiopListener,
) -> CommandLine {
    let mut args = vec![
        "--listeneraddress".to_string(),
        listener.listener_address.clone(),
        "--iiopport".to_string(),
        listener.port.to_string(),
        format!("--securityenabled={}", listener.security_enabled),
        format!("--enabled={}", listener.enabled),
        "--target".to_string(),
        listener.target.clone(),
    ];
    if !listener.properties.is_empty() {
        let props: Vec<String> = listener
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={}", escape_property(v)))
            .collect();
        args.push("--property".to_string());
        args.push(props.join(":"));
    }
    args.push(listener.id.clone());

    remote_asadmin(spec, install)
        .terse(false)
        .echo(true)
        .command("create-iiop-listener", args)
}

/// asadmin uses `:` to separate properties, so embedded colons are escaped.
fn escape_property(value: &str) -> String {
    value.replace(':', "\\:")
}

/// Path argument used by the lifecycle commands when a password file is configured.
pub fn password_file_flag(password_file: Option<&Path>) -> Option<String> {
    password_file.map(|p| format!("--passwordfile={}", p.display()))
}
