//! Convergence against the in-memory host

mod common;

use asdomain_converge::planner::ids;
use asdomain_converge::{ActionOutcome, ConvergeError, DomainState, apply_domain, plan_domain};
use asdomain_core::{CoreError, IiopListener, PlatformFamily};
use common::{MockHost, hr, install, sales, service};
use secrecy::SecretString;
use std::path::PathBuf;

#[tokio::test]
async fn test_short_master_password_fails_before_any_call() {
    let host = MockHost::new();
    let install = install();

    let mut spec = sales(&install);
    spec.master_password = None;
    spec.password = Some(SecretString::new("secret".to_string()));
    let err = apply_domain(&spec, &install, &host.host()).await.unwrap_err();
    assert!(matches!(
        err,
        ConvergeError::Config(CoreError::MasterPasswordUnspecified { .. })
    ));
    assert!(host.calls().is_empty());

    spec.master_password = Some(SecretString::new("abcdef".to_string()));
    let err = apply_domain(&spec, &install, &host.host()).await.unwrap_err();
    assert!(matches!(
        err,
        ConvergeError::Config(CoreError::MasterPasswordTooShort { .. })
    ));
    assert!(err.is_config_error());
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_fresh_domain_converges() {
    let host = MockHost::new();
    let install = install();
    let spec = sales(&install);
    let service = service(&spec, &install);

    let result = apply_domain(&spec, &install, &host.host()).await.unwrap();

    let create = host
        .calls()
        .into_iter()
        .find(|c| c.contains("create-domain"))
        .unwrap();
    assert!(create.starts_with("run authbind --deep /usr/local/glassfish/glassfish/bin/asadmin"));
    assert!(create.contains("--adminport 4848"));
    assert!(create.contains("--instanceport 80"));
    assert!(!create.contains("--portbase"));
    assert!(create.ends_with("sales as glassfish"));

    assert!(host.has_file("/etc/authbind/byport/80"));
    assert!(!host.has_file("/srv/glassfish/sales/docroot/index.html"));
    assert!(host.has_file("/srv/glassfish/sales/config/default-web.xml"));
    assert!(host.has_file("/srv/glassfish/sales/config/logging.properties"));
    assert!(host.has_file("/srv/glassfish/sales/config/login.conf"));
    assert!(host.has_file("/srv/glassfish/sales/bin/sales_asadmin"));
    assert!(host.has_file(format!("/etc/init.d/{service}")));
    assert!(host.is_running(&service));

    assert_eq!(result.state, DomainState::Running);
    assert_eq!(
        result.outcome(ids::CREATE_DOMAIN),
        Some(&ActionOutcome::Updated)
    );
}

#[tokio::test]
async fn test_creation_notifications_run_in_order() {
    let host = MockHost::new();
    let install = install();
    let spec = sales(&install);
    let service = service(&spec, &install);

    apply_domain(&spec, &install, &host.host()).await.unwrap();

    let mutations = host.mutations();
    let create = mutations
        .iter()
        .position(|c| c.contains("create-domain"))
        .unwrap();
    assert_eq!(
        mutations[create + 1],
        "write /srv/glassfish/sales/config/default-web.xml"
    );
    assert_eq!(
        mutations[create + 2],
        "rm /srv/glassfish/sales/docroot/index.html"
    );

    // Start and restart were both queued; one restart runs, after enable.
    let enable = host.position(&format!("service enable {service}")).unwrap();
    let restart = host.position(&format!("service restart {service}")).unwrap();
    assert!(enable < restart);
    assert_eq!(host.count("service restart"), 1);
    assert_eq!(host.count("service start"), 0);
    assert_eq!(
        host.calls().last().unwrap(),
        &format!("service restart {service}")
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let host = MockHost::new();
    let install = install();
    let spec = sales(&install);

    apply_domain(&spec, &install, &host.host()).await.unwrap();
    host.clear_calls();
    host.put_file("/srv/glassfish/sales/docroot/index.html", "restored by user");

    let (_, plan) = plan_domain(&spec, &install, &host.host()).await.unwrap();
    assert!(!plan.creates_domain());
    assert!(plan.contains(ids::LOGGING_PROPERTIES));
    assert!(plan.contains(ids::LAUNCHER));

    let result = apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(host.count("run authbind"), 0);
    assert!(!host.calls().iter().any(|c| c.contains("create-domain")));
    // Placeholder is only removed in reaction to creation.
    assert_eq!(
        host.file("/srv/glassfish/sales/docroot/index.html").as_deref(),
        Some("restored by user")
    );
    assert_eq!(
        result.outcome(ids::DOCROOT_INDEX),
        Some(&ActionOutcome::Skipped("not notified".to_string()))
    );
    assert_eq!(
        result.outcome(ids::LOGGING_PROPERTIES),
        Some(&ActionOutcome::Unchanged)
    );
    // The unit write always requests a restart.
    assert_eq!(host.count("service restart"), 1);
    assert_eq!(result.state, DomainState::Running);
}

#[tokio::test]
async fn test_portbase_domain() {
    let host = MockHost::new();
    let install = install();
    let spec = hr(&install);

    apply_domain(&spec, &install, &host.host()).await.unwrap();

    let create = host
        .calls()
        .into_iter()
        .find(|c| c.contains("create-domain"))
        .unwrap();
    assert!(create.contains("--portbase 10000"));
    assert!(!create.contains("--instanceport"));
    assert!(!create.contains("--adminport"));
    assert!(!create.contains("authbind"));
    assert!(!host.calls().iter().any(|c| c.contains("/etc/authbind")));
}

#[tokio::test]
async fn test_systemd_and_init_script_are_exclusive() {
    let install = install();

    for systemd_enabled in [true, false] {
        let host = MockHost::new();
        let mut spec = sales(&install);
        spec.systemd_enabled = systemd_enabled;
        let service = service(&spec, &install);

        let result = apply_domain(&spec, &install, &host.host()).await.unwrap();

        let systemd_path = format!("/lib/systemd/system/{service}.service");
        let init_path = format!("/etc/init.d/{service}");
        assert_eq!(host.has_file(&systemd_path), systemd_enabled);
        assert_eq!(host.has_file(&init_path), !systemd_enabled);

        let skipped = if systemd_enabled {
            ids::INIT_SCRIPT
        } else {
            ids::SYSTEMD_UNIT
        };
        assert!(matches!(
            result.outcome(skipped),
            Some(ActionOutcome::Skipped(_))
        ));
    }
}

#[tokio::test]
async fn test_master_password_relocated_once() {
    let host = MockHost::new();
    *host.misplace_master_password.lock().unwrap() = true;
    let install = install();
    let spec = sales(&install);

    apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(
        host.file("/srv/glassfish/sales/master-password").as_deref(),
        Some("keystore-secret")
    );
    let attrs = host.modes.lock().unwrap()[&PathBuf::from("/srv/glassfish/sales/master-password")]
        .clone();
    assert_eq!(attrs.owner.as_deref(), Some("glassfish"));

    host.put_file("/srv/glassfish/sales/master-password", "rotated");
    host.clear_calls();
    let result = apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(host.count("copy "), 0);
    assert_eq!(
        host.file("/srv/glassfish/sales/master-password").as_deref(),
        Some("rotated")
    );
    assert!(matches!(
        result.outcome(ids::RELOCATE_MASTER_PASSWORD),
        Some(ActionOutcome::Skipped(_))
    ));
}

#[tokio::test]
async fn test_relocation_skipped_without_source() {
    let host = MockHost::new();
    let install = install();
    let spec = sales(&install);

    apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(host.count("copy "), 0);
    assert!(!host.has_file("/srv/glassfish/sales/master-password"));
}

#[tokio::test]
async fn test_failed_creation_aborts_run() {
    let host = MockHost::new();
    *host.create_failure.lock().unwrap() =
        Some((1, "There is a process already using the admin port".to_string()));
    let install = install();
    let spec = sales(&install);

    let err = apply_domain(&spec, &install, &host.host()).await.unwrap_err();
    match err {
        ConvergeError::Process {
            command,
            status,
            stderr,
        } => {
            assert!(command.contains("create-domain"));
            assert_eq!(status, 1);
            assert!(stderr.contains("admin port"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing after the failed step ran, and nothing was rolled back.
    assert!(host.has_file("/etc/authbind/byport/80"));
    assert!(!host.has_file("/srv/glassfish/sales/config/logging.properties"));
    assert_eq!(host.count("service "), 0);
}

#[tokio::test]
async fn test_creation_timeout_propagates() {
    let host = MockHost::new();
    *host.create_times_out.lock().unwrap() = true;
    let install = install();
    let spec = sales(&install);

    let err = apply_domain(&spec, &install, &host.host()).await.unwrap_err();
    match err {
        ConvergeError::Timeout { timeout, .. } => {
            assert_eq!(timeout, install.process_timeout());
            assert!(timeout.as_secs() > install.asadmin_timeout);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_password_file_written_through_secret_writer() {
    let host = MockHost::new();
    let install = install();
    let mut spec = sales(&install);
    spec.password = Some(SecretString::new("adminadmin".to_string()));
    spec.password_file = Some(PathBuf::from("/srv/glassfish/.sales_passwd"));

    apply_domain(&spec, &install, &host.host()).await.unwrap();

    assert_eq!(host.count("secret /srv/glassfish/.sales_passwd"), 1);
    assert_eq!(
        host.file("/srv/glassfish/.sales_passwd").as_deref(),
        Some("AS_ADMIN_PASSWORD=adminadmin\nAS_ADMIN_MASTERPASSWORD=supersecret\n")
    );
    let secret_pos = host.position("secret /srv/glassfish/.sales_passwd").unwrap();
    let create_pos = host
        .calls()
        .iter()
        .position(|c| c.contains("create-domain"))
        .unwrap();
    assert!(secret_pos < create_pos);
}

#[tokio::test]
async fn test_custom_accounts_provisioned() {
    let host = MockHost::new();
    let install = install();
    let mut spec = sales(&install);
    spec.system_user = "sales".to_string();
    spec.system_group = "sales".to_string();

    apply_domain(&spec, &install, &host.host()).await.unwrap();

    let mutations = host.mutations();
    assert_eq!(mutations[0], "group sales");
    assert_eq!(mutations[1], "user sales");
    assert!(host
        .calls()
        .iter()
        .any(|c| c.contains("create-domain") && c.ends_with("as sales")));
}

#[tokio::test]
async fn test_fresh_run_as_user_converges() {
    let host = MockHost::new();
    *host.resolve_users.lock().unwrap() = true;
    let install = install();
    let mut spec = sales(&install);
    spec.system_user = "sales".to_string();
    spec.system_group = "sales".to_string();

    let (observation, plan) = plan_domain(&spec, &install, &host.host()).await.unwrap();
    assert!(!observation.domain_exists);
    assert!(plan.actions.iter().any(|a| a.id == ids::CREATE_DOMAIN));

    let result = apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(result.state, DomainState::Running);
    assert!(host.domains.lock().unwrap().contains("sales"));
    let user = host.position("user sales").unwrap();
    let create = host
        .calls()
        .iter()
        .position(|c| c.contains("create-domain"))
        .unwrap();
    assert!(user < create);
}

#[tokio::test]
async fn test_iiop_listener_created_once() {
    let host = MockHost::new();
    let install = install();
    let mut spec = sales(&install);
    spec.iiop_listeners.push(IiopListener::new("orb-listener-2"));

    apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(host.count("run create-iiop-listener"), 1);
    let start = host.position("service start glassfish-sales").unwrap();
    let create = host.position("run create-iiop-listener as glassfish").unwrap();
    assert!(start < create);

    apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert_eq!(host.count("run create-iiop-listener"), 1);
}

#[tokio::test]
async fn test_unknown_platform_is_reported() {
    let host = MockHost::new();
    let mut install = install();
    install.platform_family = Some(PlatformFamily::Unknown("arch".to_string()));
    let spec = sales(&install);

    let (_, plan) = plan_domain(&spec, &install, &host.host()).await.unwrap();
    assert!(!plan.contains(ids::INIT_SCRIPT));
    assert!(plan.warnings.iter().any(|w| w.contains("arch")));

    // Without a unit the service cannot be enabled; the gap surfaces as an error.
    let err = apply_domain(&spec, &install, &host.host()).await.unwrap_err();
    assert!(matches!(err, ConvergeError::ServiceNotRegistered(_)));
}

#[tokio::test]
async fn test_missing_default_web_template_skips_write() {
    let host = MockHost::new();
    host.missing_templates
        .lock()
        .unwrap()
        .insert("default-web-4.1.1.xml".to_string());
    let install = install();
    let spec = sales(&install);

    let result = apply_domain(&spec, &install, &host.host()).await.unwrap();
    assert!(!host.has_file("/srv/glassfish/sales/config/default-web.xml"));
    assert!(!host.has_file("/srv/glassfish/sales/docroot/index.html"));
    assert!(result.warnings.iter().any(|w| w.contains("default-web")));
}
