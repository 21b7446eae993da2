//! Domain teardown
//!
//! Stops and disables the service, removes every unit file location and
//! deletes the domain directory. A service the manager does not know and
//! files that are already gone count as success.

use crate::action::{Action, ActionKind, ActionPlan, ApplyResult, DomainState, ServiceOp};
use crate::error::Result;
use crate::executor::Executor;
use crate::host::Host;
use crate::planner::ids;
use asdomain_core::{DomainSpec, InstallSettings, ServiceRecord};
use tracing::info;

pub fn plan_destroy(spec: &DomainSpec, install: &InstallSettings) -> ActionPlan {
    let record = ServiceRecord::for_domain(spec, install);
    let mut plan = ActionPlan::new(&spec.domain_name, &record.name);

    for (id, op) in [
        (ids::SERVICE_STOP, ServiceOp::Stop),
        (ids::SERVICE_DISABLE, ServiceOp::Disable),
    ] {
        plan.push(Action::new(
            id,
            ActionKind::Service {
                op,
                name: record.name.clone(),
                tolerate_absent: true,
            },
        ));
    }

    let [init_script, systemd_unit] = record.all_unit_paths();
    plan.push(Action::new(
        ids::INIT_SCRIPT,
        ActionKind::DeleteFile { path: init_script },
    ));
    plan.push(Action::new(
        ids::SYSTEMD_UNIT,
        ActionKind::DeleteFile { path: systemd_unit },
    ));
    plan.push(Action::new(
        ids::DOMAIN_DIR,
        ActionKind::DeleteDirectory {
            path: spec.domain_dir_path.clone(),
        },
    ));

    plan
}

/// Remove a domain and its service. Destructive and immediate.
pub async fn destroy(
    spec: &DomainSpec,
    install: &InstallSettings,
    host: &Host<'_>,
) -> Result<ApplyResult> {
    let plan = plan_destroy(spec, install);
    let mut result = Executor::new(*host)
        .execute(&plan, DomainState::Absent)
        .await?;
    result.state = DomainState::Absent;
    info!(domain = %spec.domain_name, "Domain destroyed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_plan_destroy_order() {
        let install = InstallSettings::default();
        let spec = DomainSpec::new("sales", &install);
        let plan = plan_destroy(&spec, &install);

        assert_eq!(
            plan.ids(),
            vec![
                ids::SERVICE_STOP,
                ids::SERVICE_DISABLE,
                ids::INIT_SCRIPT,
                ids::SYSTEMD_UNIT,
                ids::DOMAIN_DIR,
            ]
        );
        assert!(plan.actions.iter().all(|a| a.guards.is_empty()));

        match &plan.get(ids::INIT_SCRIPT).unwrap().kind {
            ActionKind::DeleteFile { path } => {
                assert_eq!(path, &PathBuf::from("/etc/init.d/glassfish-sales"))
            }
            other => panic!("unexpected kind {other}"),
        }
        match &plan.get(ids::SYSTEMD_UNIT).unwrap().kind {
            ActionKind::DeleteFile { path } => assert_eq!(
                path,
                &PathBuf::from("/lib/systemd/system/glassfish-sales.service")
            ),
            other => panic!("unexpected kind {other}"),
        }
    }
}
