//! In-memory host that records every collaborator call

#![allow(dead_code)]

use asdomain_converge::{
    AccountManager, ConvergeError, FileAttrs, FileSystem, Host, ProcessOutput, ProcessRunner,
    Result, RunAs, SecretFileWriter, ServiceManager, TemplateRenderer, UserAccount,
};
use asdomain_core::{
    CommandLine, DomainSpec, InstallSettings, PlatformFamily, ServiceState, service_name,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockHost {
    pub calls: Mutex<Vec<String>>,
    pub files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    pub modes: Mutex<BTreeMap<PathBuf, FileAttrs>>,
    pub dirs: Mutex<BTreeSet<PathBuf>>,
    /// Domains the fake domain manager lists
    pub domains: Mutex<BTreeSet<String>>,
    pub iiop_listeners: Mutex<BTreeSet<String>>,
    pub services: Mutex<BTreeSet<String>>,
    pub running: Mutex<BTreeSet<String>>,
    pub groups: Mutex<BTreeSet<String>>,
    pub users: Mutex<BTreeSet<String>>,
    pub missing_templates: Mutex<BTreeSet<String>>,
    /// create-domain exits with this status and stderr
    pub create_failure: Mutex<Option<(i32, String)>>,
    pub create_times_out: Mutex<bool>,
    /// create-domain leaves `config/master-password` behind
    pub misplace_master_password: Mutex<bool>,
    pub service_error: Mutex<Option<String>>,
    /// Commands fail for run-as users not in `users`, like a real uid lookup
    pub resolve_users: Mutex<bool>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Host<'_> {
        Host {
            process: self,
            fs: self,
            services: self,
            secrets: self,
            templates: self,
            accounts: self,
        }
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that changed the host, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("exists ") && !c.starts_with("probe ") && !c.starts_with("status "))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().unwrap().contains_key(path.as_ref())
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().contains(path.as_ref())
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.as_bytes().to_vec());
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.lock().unwrap().insert(path.into());
    }

    pub fn register_service(&self, name: &str) {
        self.services.lock().unwrap().insert(name.to_string());
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.lock().unwrap().contains(name)
    }

    fn create_domain(&self, command: &CommandLine) {
        let Some(name) = command.args.last().cloned() else {
            return;
        };
        let domains_dir = command
            .args
            .iter()
            .position(|a| a == "--domaindir")
            .and_then(|i| command.args.get(i + 1))
            .map(PathBuf::from)
            .unwrap_or_default();
        let domain_dir = domains_dir.join(&name);

        self.domains.lock().unwrap().insert(name);
        for dir in ["", "config", "docroot", "bin", "lib", "lib/ext"] {
            self.add_dir(domain_dir.join(dir));
        }
        self.put_file(domain_dir.join("docroot/index.html"), "<html>placeholder</html>");
        if *self.misplace_master_password.lock().unwrap() {
            self.put_file(domain_dir.join("config/master-password"), "keystore-secret");
        }
    }
}

fn subcommand(command: &CommandLine) -> Option<&str> {
    const SUBCOMMANDS: &[&str] = &[
        "list-domains",
        "create-domain",
        "list-iiop-listeners",
        "create-iiop-listener",
    ];
    command
        .args
        .iter()
        .map(String::as_str)
        .find(|a| SUBCOMMANDS.contains(a))
}

#[async_trait]
impl ProcessRunner for MockHost {
    async fn run(
        &self,
        command: &CommandLine,
        run_as: Option<&RunAs>,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        let user = run_as.map(|r| r.user.as_str()).unwrap_or("root");
        if *self.resolve_users.lock().unwrap() && !self.users.lock().unwrap().contains(user) {
            return Err(ConvergeError::Account(format!("unknown user: {user}")));
        }
        match subcommand(command) {
            Some("list-domains") => {
                self.log(format!("probe list-domains as {user}"));
                let stdout = self
                    .domains
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|d| format!("{d} not running\n"))
                    .collect();
                Ok(ProcessOutput {
                    status: 0,
                    stdout,
                    stderr: String::new(),
                })
            }
            Some("list-iiop-listeners") => {
                self.log(format!("probe list-iiop-listeners as {user}"));
                let stdout = self
                    .iiop_listeners
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|l| format!("{l}\n"))
                    .collect();
                Ok(ProcessOutput {
                    status: 0,
                    stdout,
                    stderr: String::new(),
                })
            }
            Some("create-domain") => {
                self.log(format!("run {command} as {user}"));
                if *self.create_times_out.lock().unwrap() {
                    return Err(ConvergeError::Timeout {
                        command: command.to_string(),
                        timeout,
                    });
                }
                if let Some((status, stderr)) = self.create_failure.lock().unwrap().clone() {
                    return Ok(ProcessOutput {
                        status,
                        stdout: String::new(),
                        stderr,
                    });
                }
                self.create_domain(command);
                Ok(ProcessOutput::default())
            }
            Some("create-iiop-listener") => {
                self.log(format!("run create-iiop-listener as {user}"));
                if let Some(id) = command.args.last() {
                    self.iiop_listeners.lock().unwrap().insert(id.clone());
                }
                Ok(ProcessOutput::default())
            }
            _ => {
                self.log(format!("run {command} as {user}"));
                Ok(ProcessOutput::default())
            }
        }
    }
}

#[async_trait]
impl FileSystem for MockHost {
    async fn exists(&self, path: &Path) -> Result<bool> {
        self.log(format!("exists {}", path.display()));
        Ok(self.has_file(path) || self.has_dir(path))
    }

    async fn write(&self, path: &Path, content: &[u8], attrs: &FileAttrs) -> Result<bool> {
        self.log(format!("write {}", path.display()));
        self.modes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), attrs.clone());
        let mut files = self.files.lock().unwrap();
        if files.get(path).map(Vec::as_slice) == Some(content) {
            return Ok(false);
        }
        files.insert(path.to_path_buf(), content.to_vec());
        Ok(true)
    }

    async fn copy(&self, from: &Path, to: &Path, attrs: &FileAttrs) -> Result<bool> {
        self.log(format!("copy {} {}", from.display(), to.display()));
        let content = self
            .files
            .lock()
            .unwrap()
            .get(from)
            .cloned()
            .ok_or_else(|| ConvergeError::io(from, "No such file or directory"))?;
        self.modes
            .lock()
            .unwrap()
            .insert(to.to_path_buf(), attrs.clone());
        self.files.lock().unwrap().insert(to.to_path_buf(), content);
        Ok(true)
    }

    async fn create_dir(&self, path: &Path, attrs: &FileAttrs, _recursive: bool) -> Result<bool> {
        self.log(format!("mkdir {}", path.display()));
        self.modes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), attrs.clone());
        Ok(self.dirs.lock().unwrap().insert(path.to_path_buf()))
    }

    async fn remove_file(&self, path: &Path) -> Result<bool> {
        self.log(format!("rm {}", path.display()));
        Ok(self.files.lock().unwrap().remove(path).is_some())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        self.log(format!("rm -r {}", path.display()));
        let existed = self.dirs.lock().unwrap().contains(path);
        self.dirs.lock().unwrap().retain(|d| !d.starts_with(path));
        self.files.lock().unwrap().retain(|f, _| !f.starts_with(path));
        Ok(existed)
    }
}

#[async_trait]
impl ServiceManager for MockHost {
    async fn start(&self, name: &str) -> Result<()> {
        self.service_op("start", name)?;
        self.running.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.service_op("stop", name)?;
        self.running.lock().unwrap().remove(name);
        Ok(())
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.service_op("restart", name)?;
        self.running.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn enable(&self, name: &str) -> Result<()> {
        self.log(format!("service enable {name}"));
        let unit_written = self.files.lock().unwrap().keys().any(|p| {
            p == &PathBuf::from(format!("/etc/init.d/{name}"))
                || p == &PathBuf::from(format!("/lib/systemd/system/{name}.service"))
        });
        if unit_written {
            self.register_service(name);
        }
        self.check_registered(name)
    }

    async fn disable(&self, name: &str) -> Result<()> {
        self.service_op("disable", name)
    }

    async fn status(&self, name: &str) -> Result<ServiceState> {
        self.log(format!("status {name}"));
        if !self.services.lock().unwrap().contains(name) {
            return Err(ConvergeError::ServiceNotRegistered(name.to_string()));
        }
        Ok(if self.is_running(name) {
            ServiceState::Running
        } else {
            ServiceState::Enabled
        })
    }
}

impl MockHost {
    fn service_op(&self, op: &str, name: &str) -> Result<()> {
        self.log(format!("service {op} {name}"));
        if let Some(message) = self.service_error.lock().unwrap().clone() {
            return Err(ConvergeError::Service {
                name: name.to_string(),
                operation: op.to_string(),
                message,
            });
        }
        self.check_registered(name)
    }

    fn check_registered(&self, name: &str) -> Result<()> {
        if self.services.lock().unwrap().contains(name) {
            Ok(())
        } else {
            Err(ConvergeError::ServiceNotRegistered(name.to_string()))
        }
    }
}

#[async_trait]
impl SecretFileWriter for MockHost {
    async fn write_secret(
        &self,
        path: &Path,
        content: &SecretString,
        attrs: &FileAttrs,
    ) -> Result<bool> {
        self.log(format!("secret {}", path.display()));
        self.modes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), attrs.clone());
        let bytes = content.expose_secret().as_bytes().to_vec();
        let mut files = self.files.lock().unwrap();
        if files.get(path) == Some(&bytes) {
            return Ok(false);
        }
        files.insert(path.to_path_buf(), bytes);
        Ok(true)
    }
}

impl TemplateRenderer for MockHost {
    fn has_template(&self, name: &str) -> bool {
        !self.missing_templates.lock().unwrap().contains(name)
    }

    fn render(&self, name: &str, variables: &serde_json::Value) -> Result<String> {
        Ok(format!("{name}\n{variables}\n"))
    }
}

#[async_trait]
impl AccountManager for MockHost {
    async fn ensure_group(&self, name: &str) -> Result<bool> {
        self.log(format!("group {name}"));
        Ok(self.groups.lock().unwrap().insert(name.to_string()))
    }

    async fn ensure_user(&self, account: &UserAccount) -> Result<bool> {
        self.log(format!("user {}", account.name));
        Ok(self.users.lock().unwrap().insert(account.name.clone()))
    }
}

pub fn install() -> InstallSettings {
    InstallSettings {
        platform_family: Some(PlatformFamily::Debian),
        ..InstallSettings::default()
    }
}

/// port 80, admin 4848, master password "supersecret"
pub fn sales(install: &InstallSettings) -> DomainSpec {
    let mut spec = DomainSpec::new("sales", install);
    spec.port = 80;
    spec.admin_port = 4848;
    spec.master_password = Some(SecretString::new("supersecret".to_string()));
    spec
}

pub fn hr(install: &InstallSettings) -> DomainSpec {
    let mut spec = DomainSpec::new("hr", install);
    spec.portbase = Some(10000);
    spec.password = Some(SecretString::new("adminadmin".to_string()));
    spec
}

pub fn service(spec: &DomainSpec, install: &InstallSettings) -> String {
    service_name(spec, install)
}
