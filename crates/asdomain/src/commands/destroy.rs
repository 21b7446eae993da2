use crate::utils;
use asdomain_core::Manifest;
use asdomain_host::LocalHost;
use colored::Colorize;

pub async fn handle(manifest: &Manifest, domain: &str, yes: bool, json: bool) -> anyhow::Result<()> {
    let spec = manifest.domain(domain)?;

    if !yes {
        let plan = asdomain_converge::plan_destroy(spec, &manifest.install);
        println!();
        println!(
            "{}",
            format!("Destroying {} will run:", spec.domain_name).bold()
        );
        for line in plan.to_string().lines() {
            println!("  {line}");
        }
        println!();
        println!(
            "{}",
            format!(
                "Warning: {} and everything in it will be deleted.",
                spec.domain_dir_path.display()
            )
            .yellow()
        );
        println!("Pass --yes to proceed");
        return Ok(());
    }

    let local = LocalHost::new(&manifest.install)?;
    let result = asdomain_converge::destroy(spec, &manifest.install, &local.host()).await?;

    if json {
        utils::print_json(std::slice::from_ref(&result))?;
    } else {
        println!();
        println!(
            "{}",
            format!("■ Destroyed {}", spec.domain_name).yellow().bold()
        );
        utils::print_result(&result);
    }
    Ok(())
}
