//! asdomain convergence engine
//!
//! Given a [`DomainSpec`] and the current state of the host, computes an
//! ordered plan of guarded actions and applies it through the collaborator
//! traits in [`host`]. Runs are sequential and safe to repeat: every step is
//! either idempotent or guarded by an existence check.
//!
//! ```text
//! DomainSpec ──► secret check ──► observe ──► converge ──► Executor ──► ApplyResult
//!                    │                          (pure)        │
//!                    └─ ConfigError, no host calls            └─ Host collaborators
//! ```

pub mod action;
pub mod error;
pub mod executor;
pub mod host;
pub mod observe;
pub mod planner;
pub mod teardown;

pub use action::{
    Action, ActionKind, ActionOutcome, ActionPlan, ActionReport, ApplyResult, ApplySummary,
    Condition, DomainState, Guard, Notification, NotifyTarget, ServiceOp, Timing, Trigger,
};
pub use error::{ConvergeError, Result};
pub use executor::Executor;
pub use host::{
    AccountManager, FileAttrs, FileSystem, Host, ProcessOutput, ProcessRunner, RunAs,
    SecretFileWriter, ServiceManager, TemplateRenderer, UserAccount,
};
pub use observe::{HostObservation, observe};
pub use planner::converge;
pub use teardown::{destroy, plan_destroy};

use asdomain_core::{DomainSpec, InstallSettings, secret};
use tracing::{info, warn};

/// Checks that need no host access. Must pass before anything else runs.
pub fn validate(spec: &DomainSpec) -> Result<()> {
    spec.validate()?;
    secret::master_password_for(spec)?;
    Ok(())
}

/// Observe the host and compute the plan without applying it.
#[tracing::instrument(skip_all, fields(domain = %spec.domain_name))]
pub async fn plan_domain(
    spec: &DomainSpec,
    install: &InstallSettings,
    host: &Host<'_>,
) -> Result<(HostObservation, ActionPlan)> {
    validate(spec)?;
    let observation = observe(spec, install, host).await?;
    let plan = converge(spec, install, &observation)?;
    Ok((observation, plan))
}

/// Converge one domain to its declared state.
#[tracing::instrument(skip_all, fields(domain = %spec.domain_name))]
pub async fn apply_domain(
    spec: &DomainSpec,
    install: &InstallSettings,
    host: &Host<'_>,
) -> Result<ApplyResult> {
    let (observation, plan) = plan_domain(spec, install, host).await?;
    for warning in &plan.warnings {
        warn!("{warning}");
    }
    info!(
        actions = plan.actions.len(),
        domain_exists = observation.domain_exists,
        "Applying plan"
    );

    let result = Executor::new(*host)
        .execute(&plan, observation.initial_state())
        .await?;
    info!(state = %result.state, summary = %result.summary(), "Converged");
    Ok(result)
}
