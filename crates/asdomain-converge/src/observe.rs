//! Host observation
//!
//! Facts read from the host at the start of each run. Never cached; every
//! run re-reads them.

use crate::action::DomainState;
use crate::error::{ConvergeError, Result};
use crate::host::{Host, RunAs};
use asdomain_core::asadmin::{domain_listed, list_domains_command};
use asdomain_core::privilege::DELEGATION_BINARY;
use asdomain_core::template::default_web_template;
use asdomain_core::{DomainSpec, InstallSettings, ServiceState, service_name};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostObservation {
    /// The domain manager lists this domain.
    pub domain_exists: bool,
    /// The low-port delegation helper is installed.
    pub delegation_available: bool,
    /// A `default-web-<version>.xml` template can be rendered.
    pub default_web_template: bool,
    pub service_state: ServiceState,
}

impl Default for HostObservation {
    fn default() -> Self {
        Self {
            domain_exists: false,
            delegation_available: true,
            default_web_template: true,
            service_state: ServiceState::Absent,
        }
    }
}

impl HostObservation {
    pub fn initial_state(&self) -> DomainState {
        match (self.domain_exists, self.service_state) {
            (false, _) => DomainState::Absent,
            (true, ServiceState::Running) => DomainState::Running,
            (true, ServiceState::Enabled) => DomainState::ServiceRegistered,
            (true, _) => DomainState::CreatedNotConfigured,
        }
    }
}

pub async fn observe(
    spec: &DomainSpec,
    install: &InstallSettings,
    host: &Host<'_>,
) -> Result<HostObservation> {
    let run_as = RunAs::new(&spec.system_user, &spec.system_group);
    let listing = host
        .process
        .run(
            &list_domains_command(install),
            Some(&run_as),
            install.process_timeout(),
        )
        .await;
    // The run-as account may be created by this very plan.
    let domain_exists = match listing {
        Ok(listing) => listing.success() && domain_listed(&listing.stdout, &spec.domain_name),
        Err(ConvergeError::Account(message)) => {
            debug!(
                user = %spec.system_user,
                %message,
                "Run-as account missing, domain not listed"
            );
            false
        }
        Err(e) => return Err(e),
    };

    let delegation_available = host.fs.exists(Path::new(DELEGATION_BINARY)).await?;
    let default_web_template = host
        .templates
        .has_template(&default_web_template(&install.version));

    let service = service_name(spec, install);
    let service_state = match host.services.status(&service).await {
        Ok(state) => state,
        Err(ConvergeError::ServiceNotRegistered(_)) => ServiceState::Absent,
        Err(e) => return Err(e),
    };

    let observation = HostObservation {
        domain_exists,
        delegation_available,
        default_web_template,
        service_state,
    };
    debug!(domain = %spec.domain_name, ?observation, "Observed host");
    Ok(observation)
}
