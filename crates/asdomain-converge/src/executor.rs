//! Sequential plan executor
//!
//! Runs actions in plan order. An action's immediate notifications run
//! right after it, depth first, before the next plan entry. Delayed
//! notifications are queued, deduplicated and flushed once the plan is
//! exhausted.

use crate::action::{
    Action, ActionKind, ActionOutcome, ActionPlan, ApplyResult, Condition, DomainState, Guard,
    NotifyTarget, ServiceOp, Timing, Trigger,
};
use crate::error::{ConvergeError, Result};
use crate::host::{Host, RunAs};
use asdomain_core::CommandLine;
use asdomain_core::asadmin::domain_listed;
use std::borrow::Cow;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct Executor<'a> {
    host: Host<'a>,
}

/// Mutable bookkeeping for one run
struct Run {
    result: ApplyResult,
    delayed: Vec<NotifyTarget>,
    ran: HashSet<String>,
}

impl<'a> Executor<'a> {
    pub fn new(host: Host<'a>) -> Self {
        Self { host }
    }

    pub async fn execute(&self, plan: &ActionPlan, initial: DomainState) -> Result<ApplyResult> {
        let started = Instant::now();
        let mut run = Run {
            result: ApplyResult::new(&plan.domain),
            delayed: Vec::new(),
            ran: HashSet::new(),
        };
        run.result.state = initial;
        run.result.warnings = plan.warnings.clone();

        for action in &plan.actions {
            if action.trigger == Trigger::OnNotify {
                continue;
            }
            self.run_chain(plan, Cow::Borrowed(action), &mut run)
                .await?;
        }

        let mut flushed: Vec<NotifyTarget> = Vec::new();
        loop {
            let pending: Vec<NotifyTarget> = coalesce(std::mem::take(&mut run.delayed))
                .into_iter()
                .filter(|t| !flushed.contains(t))
                .collect();
            if pending.is_empty() {
                break;
            }
            for target in pending {
                debug!(target = %target, "Running delayed notification");
                flushed.push(target.clone());
                let action = resolve(plan, &target)?;
                self.run_chain(plan, action, &mut run).await?;
            }
        }

        for action in &plan.actions {
            if action.trigger == Trigger::OnNotify && !run.ran.contains(&action.id) {
                run.result
                    .record(action, ActionOutcome::Skipped("not notified".to_string()));
            }
        }

        run.result.duration_ms = started.elapsed().as_millis() as u64;
        Ok(run.result)
    }

    /// Run one action and, depth first, everything it notifies immediately.
    async fn run_chain<'p>(
        &self,
        plan: &'p ActionPlan,
        first: Cow<'p, Action>,
        run: &mut Run,
    ) -> Result<()> {
        let mut queue = VecDeque::from([first]);

        while let Some(action) = queue.pop_front() {
            if !self.run_action(&action, run).await? {
                continue;
            }

            let mut immediate = Vec::new();
            for notification in &action.notifies {
                match notification.timing {
                    Timing::Immediate => {
                        debug!(from = %action.id, target = %notification.target, "Notifying");
                        immediate.push(resolve(plan, &notification.target)?);
                    }
                    Timing::Delayed => {
                        if !run.delayed.contains(&notification.target) {
                            run.delayed.push(notification.target.clone());
                        }
                    }
                }
            }
            for target in immediate.into_iter().rev() {
                queue.push_front(target);
            }
        }
        Ok(())
    }

    /// Returns whether the action's notifications should fire.
    async fn run_action(&self, action: &Action, run: &mut Run) -> Result<bool> {
        run.ran.insert(action.id.clone());

        if let Some(reason) = self.blocking_guard(action).await? {
            debug!(action = %action.id, reason = %reason, "Skipped");
            run.result.record(action, ActionOutcome::Skipped(reason));
            advance(run, action);
            return Ok(false);
        }

        if action.kind.is_create_domain() {
            run.result.state = DomainState::Creating;
        }

        let outcome = match self.apply(&action.kind).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(action = %action.id, state = %run.result.state, error = %e, "Action failed");
                return Err(e);
            }
        };

        match &outcome {
            ActionOutcome::Updated => info!(action = %action.id, "{}", action.kind),
            other => debug!(action = %action.id, outcome = ?other, "{}", action.kind),
        }

        if let ActionKind::Service {
            op: ServiceOp::Start | ServiceOp::Restart,
            ..
        } = action.kind
            && outcome == ActionOutcome::Updated
            && run.result.state >= DomainState::ServiceRegistered
        {
            run.result.state = DomainState::Running;
        }
        advance(run, action);

        let fire = match outcome {
            ActionOutcome::Updated => true,
            ActionOutcome::Unchanged | ActionOutcome::Absent => action.notify_unchanged,
            ActionOutcome::Skipped(_) => false,
        };
        run.result.record(action, outcome);
        Ok(fire)
    }

    /// The first guard that prevents the action from running, if any.
    async fn blocking_guard(&self, action: &Action) -> Result<Option<String>> {
        for guard in &action.guards {
            let blocked = match guard {
                Guard::OnlyIf(condition) => !self.holds(condition).await?,
                Guard::NotIf(condition) => self.holds(condition).await?,
            };
            if blocked {
                return Ok(Some(guard.to_string()));
            }
        }
        Ok(None)
    }

    async fn holds(&self, condition: &Condition) -> Result<bool> {
        match condition {
            Condition::FileExists(path) => self.host.fs.exists(path).await,
            Condition::Setting { enabled, .. } => Ok(*enabled),
            Condition::Listed {
                command,
                run_as,
                timeout,
                needle,
            } => {
                let output = self.host.process.run(command, Some(run_as), *timeout).await?;
                Ok(output.success() && domain_listed(&output.stdout, needle))
            }
        }
    }

    async fn apply(&self, kind: &ActionKind) -> Result<ActionOutcome> {
        let host = &self.host;
        let changed = match kind {
            ActionKind::EnsureGroup { name } => host.accounts.ensure_group(name).await?,
            ActionKind::EnsureUser(account) => host.accounts.ensure_user(account).await?,
            ActionKind::EnsureDirectory {
                path,
                attrs,
                recursive,
            } => host.fs.create_dir(path, attrs, *recursive).await?,
            ActionKind::WriteSecret {
                path,
                content,
                attrs,
            } => host.secrets.write_secret(path, content, attrs).await?,
            ActionKind::WriteFile {
                path,
                content,
                attrs,
            } => host.fs.write(path, content.as_bytes(), attrs).await?,
            ActionKind::WriteTemplate {
                path,
                template,
                variables,
                attrs,
            } => {
                let content = host.templates.render(template, variables)?;
                host.fs.write(path, content.as_bytes(), attrs).await?
            }
            ActionKind::CopyFile { from, to, attrs } => host.fs.copy(from, to, attrs).await?,
            ActionKind::DeleteFile { path } => {
                return Ok(removed(host.fs.remove_file(path).await?));
            }
            ActionKind::DeleteDirectory { path } => {
                return Ok(removed(host.fs.remove_dir_all(path).await?));
            }
            ActionKind::CreateDomain {
                command,
                run_as,
                timeout,
            }
            | ActionKind::Execute {
                command,
                run_as,
                timeout,
            } => {
                self.run_checked(command, run_as, *timeout).await?;
                true
            }
            ActionKind::Service {
                op,
                name,
                tolerate_absent,
            } => {
                let services = host.services;
                let result = match op {
                    ServiceOp::Start => services.start(name).await,
                    ServiceOp::Stop => services.stop(name).await,
                    ServiceOp::Restart => services.restart(name).await,
                    ServiceOp::Enable => services.enable(name).await,
                    ServiceOp::Disable => services.disable(name).await,
                };
                match result {
                    Ok(()) => true,
                    Err(ConvergeError::ServiceNotRegistered(_)) if *tolerate_absent => {
                        warn!(service = %name, operation = %op, "Service not registered, ignoring");
                        return Ok(ActionOutcome::Absent);
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(if changed {
            ActionOutcome::Updated
        } else {
            ActionOutcome::Unchanged
        })
    }

    async fn run_checked(
        &self,
        command: &CommandLine,
        run_as: &RunAs,
        timeout: Duration,
    ) -> Result<()> {
        let output = self.host.process.run(command, Some(run_as), timeout).await?;
        if output.success() {
            return Ok(());
        }
        let stderr = if output.stderr.trim().is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        Err(ConvergeError::Process {
            command: command.to_string(),
            status: output.status,
            stderr,
        })
    }
}

fn removed(existed: bool) -> ActionOutcome {
    if existed {
        ActionOutcome::Updated
    } else {
        ActionOutcome::Absent
    }
}

fn advance(run: &mut Run, action: &Action) {
    if let Some(stage) = action.reaches {
        run.result.state = run.result.state.max(stage);
    }
}

fn resolve<'p>(plan: &'p ActionPlan, target: &NotifyTarget) -> Result<Cow<'p, Action>> {
    match target {
        NotifyTarget::Action(id) => plan
            .get(id)
            .map(Cow::Borrowed)
            .ok_or_else(|| ConvergeError::UnknownNotificationTarget(id.clone())),
        NotifyTarget::Service(op) => Ok(Cow::Owned(Action::new(
            format!("service:{op}"),
            ActionKind::Service {
                op: *op,
                name: plan.service_name.clone(),
                tolerate_absent: false,
            },
        ))),
    }
}

/// Deduplicate queued targets; a queued restart absorbs a queued start.
pub(crate) fn coalesce(targets: Vec<NotifyTarget>) -> Vec<NotifyTarget> {
    let restart = NotifyTarget::Service(ServiceOp::Restart);
    let start = NotifyTarget::Service(ServiceOp::Start);
    let has_restart = targets.contains(&restart);

    let mut out: Vec<NotifyTarget> = Vec::new();
    for target in targets {
        let target = if has_restart && target == start {
            restart.clone()
        } else {
            target
        };
        if !out.contains(&target) {
            out.push(target);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_dedupes_in_order() {
        let targets = vec![
            NotifyTarget::Service(ServiceOp::Restart),
            NotifyTarget::Action("a".to_string()),
            NotifyTarget::Service(ServiceOp::Restart),
        ];
        assert_eq!(
            coalesce(targets),
            vec![
                NotifyTarget::Service(ServiceOp::Restart),
                NotifyTarget::Action("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_coalesce_restart_absorbs_start() {
        let targets = vec![
            NotifyTarget::Service(ServiceOp::Start),
            NotifyTarget::Service(ServiceOp::Restart),
        ];
        assert_eq!(
            coalesce(targets),
            vec![NotifyTarget::Service(ServiceOp::Restart)]
        );
    }

    #[test]
    fn test_coalesce_keeps_lone_start() {
        let targets = vec![NotifyTarget::Service(ServiceOp::Start)];
        assert_eq!(coalesce(targets), vec![NotifyTarget::Service(ServiceOp::Start)]);
    }
}
