use crate::utils;
use anyhow::Context;
use asdomain_core::Manifest;
use asdomain_host::LocalHost;
use colored::Colorize;

pub async fn handle(manifest: &Manifest, domain: Option<&str>, json: bool) -> anyhow::Result<()> {
    let specs = utils::select_domains(manifest, domain)?;
    for spec in &specs {
        asdomain_converge::validate(spec)
            .with_context(|| format!("Domain '{}' is invalid", spec.domain_name))?;
    }
    let local = LocalHost::new(&manifest.install)?;
    let host = local.host();

    let mut results = Vec::with_capacity(specs.len());
    for spec in specs {
        if !json {
            println!();
            println!(
                "{}",
                format!("■ Converging {}", spec.domain_name).yellow().bold()
            );
        }

        let result = asdomain_converge::apply_domain(spec, &manifest.install, &host).await?;
        if !json {
            utils::print_result(&result);
        }
        results.push(result);
    }

    if json {
        utils::print_json(&results)?;
    }
    Ok(())
}
