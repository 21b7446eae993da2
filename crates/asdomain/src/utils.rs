use asdomain_converge::{ActionOutcome, ApplyResult};
use asdomain_core::{DomainSpec, Manifest};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Locate and parse the configuration, filling in the platform family from
/// the host when the file leaves it out.
pub fn load_manifest(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, Manifest)> {
    let path = asdomain_config::resolve_config_path(explicit)?;
    let mut manifest = asdomain_core::parse_kdl_file(&path)?;

    if manifest.install.platform_family.is_none() {
        let family = asdomain_host::detect_platform_family();
        tracing::debug!(%family, "Detected platform family");
        manifest.install.platform_family = Some(family);
    }

    Ok((path, manifest))
}

/// The named domain, or every declared domain.
pub fn select_domains<'a>(
    manifest: &'a Manifest,
    name: Option<&str>,
) -> anyhow::Result<Vec<&'a DomainSpec>> {
    if let Some(name) = name {
        return Ok(vec![manifest.domain(name)?]);
    }
    if manifest.domains.is_empty() {
        anyhow::bail!("No domains declared in the configuration");
    }
    Ok(manifest.domains.values().collect())
}

pub fn print_loaded_config_file(path: &Path) {
    println!("Configuration: {}", path.display().to_string().cyan());
}

pub fn print_result(result: &ApplyResult) {
    for report in &result.reports {
        match &report.outcome {
            ActionOutcome::Updated => {
                println!("  {} {}", "✓".green(), report.description);
            }
            ActionOutcome::Unchanged => {
                println!("  {} {}", "·".dimmed(), report.description.dimmed());
            }
            ActionOutcome::Absent => {
                println!(
                    "  {} {} {}",
                    "·".dimmed(),
                    report.description.dimmed(),
                    "(absent)".dimmed()
                );
            }
            ActionOutcome::Skipped(reason) => {
                println!(
                    "  {} {} {}",
                    "-".yellow(),
                    report.description,
                    format!("({reason})").yellow()
                );
            }
        }
    }
    for warning in &result.warnings {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }
    println!();
    println!(
        "{} {} in {} ms, state {}",
        result.domain.cyan().bold(),
        result.summary().to_string().bold(),
        result.duration_ms,
        result.state.to_string().cyan()
    );
}

pub fn print_json(results: &[ApplyResult]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}
