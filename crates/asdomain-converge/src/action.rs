//! Action plan types

use crate::host::{FileAttrs, RunAs, UserAccount};
use asdomain_core::CommandLine;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A guarded step of a plan
#[derive(Debug, Clone)]
pub struct Action {
    /// Unique within a plan; notification targets refer to it.
    pub id: String,
    pub kind: ActionKind,
    /// All guards must pass for the action to run.
    pub guards: Vec<Guard>,
    pub trigger: Trigger,
    pub notifies: Vec<Notification>,
    /// Fire notifications even when the action reported no change.
    pub notify_unchanged: bool,
    /// Domain state reached once this action has been processed.
    pub reaches: Option<DomainState>,
}

impl Action {
    pub fn new(id: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            guards: Vec::new(),
            trigger: Trigger::Always,
            notifies: Vec::new(),
            notify_unchanged: false,
            reaches: None,
        }
    }

    pub fn only_if(mut self, condition: Condition) -> Self {
        self.guards.push(Guard::OnlyIf(condition));
        self
    }

    pub fn not_if(mut self, condition: Condition) -> Self {
        self.guards.push(Guard::NotIf(condition));
        self
    }

    /// Only runs when another action notifies it.
    pub fn on_notify(mut self) -> Self {
        self.trigger = Trigger::OnNotify;
        self
    }

    pub fn notify(mut self, target: NotifyTarget, timing: Timing) -> Self {
        self.notifies.push(Notification { target, timing });
        self
    }

    pub fn notify_unchanged(mut self) -> Self {
        self.notify_unchanged = true;
        self
    }

    pub fn reaches(mut self, state: DomainState) -> Self {
        self.reaches = Some(state);
        self
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, Clone)]
pub enum ActionKind {
    EnsureGroup {
        name: String,
    },
    EnsureUser(UserAccount),
    EnsureDirectory {
        path: PathBuf,
        attrs: FileAttrs,
        recursive: bool,
    },
    WriteSecret {
        path: PathBuf,
        content: SecretString,
        attrs: FileAttrs,
    },
    WriteFile {
        path: PathBuf,
        content: String,
        attrs: FileAttrs,
    },
    WriteTemplate {
        path: PathBuf,
        template: String,
        variables: serde_json::Value,
        attrs: FileAttrs,
    },
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        attrs: FileAttrs,
    },
    DeleteFile {
        path: PathBuf,
    },
    DeleteDirectory {
        path: PathBuf,
    },
    CreateDomain {
        command: CommandLine,
        run_as: RunAs,
        timeout: Duration,
    },
    Execute {
        command: CommandLine,
        run_as: RunAs,
        timeout: Duration,
    },
    Service {
        op: ServiceOp,
        name: String,
        /// Treat an unregistered service as success.
        tolerate_absent: bool,
    },
}

impl ActionKind {
    pub fn is_create_domain(&self) -> bool {
        matches!(self, ActionKind::CreateDomain { .. })
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::EnsureGroup { name } => write!(f, "ensure group {name}"),
            ActionKind::EnsureUser(account) => write!(f, "ensure user {}", account.name),
            ActionKind::EnsureDirectory { path, .. } => {
                write!(f, "ensure directory {}", path.display())
            }
            ActionKind::WriteSecret { path, .. } => write!(f, "write secret {}", path.display()),
            ActionKind::WriteFile { path, .. } => write!(f, "write {}", path.display()),
            ActionKind::WriteTemplate { path, template, .. } => {
                write!(f, "render {template} to {}", path.display())
            }
            ActionKind::CopyFile { from, to, .. } => {
                write!(f, "copy {} to {}", from.display(), to.display())
            }
            ActionKind::DeleteFile { path } => write!(f, "delete {}", path.display()),
            ActionKind::DeleteDirectory { path } => {
                write!(f, "delete directory {}", path.display())
            }
            ActionKind::CreateDomain { command, .. } => write!(f, "run {command}"),
            ActionKind::Execute { command, .. } => write!(f, "run {command}"),
            ActionKind::Service { op, name, .. } => write!(f, "{op} service {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOp {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl fmt::Display for ServiceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceOp::Start => write!(f, "start"),
            ServiceOp::Stop => write!(f, "stop"),
            ServiceOp::Restart => write!(f, "restart"),
            ServiceOp::Enable => write!(f, "enable"),
            ServiceOp::Disable => write!(f, "disable"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Guard {
    OnlyIf(Condition),
    NotIf(Condition),
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::OnlyIf(condition) => write!(f, "only_if {condition}"),
            Guard::NotIf(condition) => write!(f, "not_if {condition}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Condition {
    FileExists(PathBuf),
    /// A setting known when the plan is built.
    Setting { name: &'static str, enabled: bool },
    /// `command` succeeds and `needle` appears as a whole token in its output.
    Listed {
        command: CommandLine,
        run_as: RunAs,
        timeout: Duration,
        needle: String,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::FileExists(path) => write!(f, "exists({})", path.display()),
            Condition::Setting { name, .. } => write!(f, "{name}"),
            Condition::Listed {
                command, needle, ..
            } => write!(f, "`{command}` lists '{needle}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Always,
    OnNotify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub target: NotifyTarget,
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotifyTarget {
    Action(String),
    /// An operation on the domain's own service.
    Service(ServiceOp),
}

impl fmt::Display for NotifyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyTarget::Action(id) => write!(f, "{id}"),
            NotifyTarget::Service(op) => write!(f, "service:{op}"),
        }
    }
}

/// Immediate notifications run right after the notifying action; delayed
/// ones are queued until the end of the run and deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    Delayed,
}

/// Ordered actions for one domain
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub domain: String,
    pub service_name: String,
    pub actions: Vec<Action>,
    /// Configuration gaps found while planning.
    pub warnings: Vec<String>,
}

impl ActionPlan {
    pub fn new(domain: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service_name: service_name.into(),
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn creates_domain(&self) -> bool {
        self.actions.iter().any(|a| a.kind.is_create_domain())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.id.as_str()).collect()
    }
}

impl fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in &self.actions {
            write!(f, "{}: {}", action.id, action.kind)?;
            if action.trigger == Trigger::OnNotify {
                write!(f, " (on notify)")?;
            }
            writeln!(f)?;
            for guard in &action.guards {
                writeln!(f, "    {guard}")?;
            }
            for n in &action.notifies {
                let timing = match n.timing {
                    Timing::Immediate => "immediately",
                    Timing::Delayed => "delayed",
                };
                writeln!(f, "    notifies {} ({timing})", n.target)?;
            }
        }
        Ok(())
    }
}

/// Lifecycle state of a domain during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    Absent,
    Creating,
    CreatedNotConfigured,
    Configured,
    ServiceRegistered,
    Running,
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomainState::Absent => "absent",
            DomainState::Creating => "creating",
            DomainState::CreatedNotConfigured => "created-not-configured",
            DomainState::Configured => "configured",
            DomainState::ServiceRegistered => "service-registered",
            DomainState::Running => "running",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum ActionOutcome {
    Updated,
    Unchanged,
    Skipped(String),
    /// The target did not exist and that was acceptable.
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub action_id: String,
    pub description: String,
    pub outcome: ActionOutcome,
}

/// Result of executing a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub domain: String,
    pub reports: Vec<ActionReport>,
    pub state: DomainState,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            reports: Vec::new(),
            state: DomainState::Absent,
            warnings: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, action: &Action, outcome: ActionOutcome) {
        self.reports.push(ActionReport {
            action_id: action.id.clone(),
            description: action.kind.to_string(),
            outcome,
        });
    }

    pub fn outcome(&self, action_id: &str) -> Option<&ActionOutcome> {
        self.reports
            .iter()
            .rev()
            .find(|r| r.action_id == action_id)
            .map(|r| &r.outcome)
    }

    pub fn has_changes(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.outcome == ActionOutcome::Updated)
    }

    pub fn summary(&self) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for report in &self.reports {
            match report.outcome {
                ActionOutcome::Updated => summary.updated += 1,
                ActionOutcome::Unchanged | ActionOutcome::Absent => summary.unchanged += 1,
                ActionOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} unchanged, {} skipped",
            self.updated, self.unchanged, self.skipped
        )
    }
}
