use crate::utils;
use asdomain_core::Manifest;
use asdomain_host::LocalHost;
use colored::Colorize;

pub async fn handle(manifest: &Manifest, domain: Option<&str>) -> anyhow::Result<()> {
    let specs = utils::select_domains(manifest, domain)?;
    let local = LocalHost::new(&manifest.install)?;
    let host = local.host();

    for spec in specs {
        let (observation, plan) =
            asdomain_converge::plan_domain(spec, &manifest.install, &host).await?;

        println!();
        println!(
            "{}",
            format!("■ Plan for {} ({})", plan.domain, plan.service_name)
                .cyan()
                .bold()
        );
        println!(
            "  domain {}, service {}",
            if observation.domain_exists {
                "exists".green()
            } else {
                "absent".yellow()
            },
            observation.service_state.to_string().cyan()
        );
        println!();
        for line in plan.to_string().lines() {
            println!("  {line}");
        }
        for warning in &plan.warnings {
            println!("  {} {}", "⚠".yellow(), warning.yellow());
        }
    }
    Ok(())
}
