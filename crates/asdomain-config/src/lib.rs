pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "ASDOMAIN_CONFIG_PATH";
pub const SYSTEM_CONFIG: &str = "/etc/asdomain/domain.kdl";

const CANDIDATES: [&str; 4] = [
    "domain.local.kdl",
    ".domain.local.kdl",
    "domain.kdl",
    ".domain.kdl",
];

/// Locate the domain configuration file.
///
/// Search order:
/// 1. `ASDOMAIN_CONFIG_PATH`
/// 2. current directory: domain.local.kdl, .domain.local.kdl, domain.kdl, .domain.kdl
/// 3. `./.asdomain/`, same order
/// 4. `~/.config/asdomain/domain.kdl`
/// 5. `/etc/asdomain/domain.kdl`
pub fn find_domain_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("asdomain").join("domain.kdl");
        if user_config.exists() {
            return Ok(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG);
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(ConfigError::DomainFileNotFound)
}

/// An explicit `--config` path wins over discovery and must exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ConfigError::ExplicitPathMissing(path.to_path_buf())),
        None => find_domain_file(),
    }
}

/// Candidate files in `dir`, then in `dir/.asdomain`.
fn find_in(dir: &Path) -> Option<PathBuf> {
    let project_dir = dir.join(".asdomain");
    let search_dirs = [dir.to_path_buf(), project_dir];
    search_dirs
        .iter()
        .filter(|d| d.is_dir())
        .flat_map(|d| CANDIDATES.iter().map(move |name| d.join(name)))
        .find(|path| path.exists())
}
