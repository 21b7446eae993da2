//! Platform family detection from `/etc/os-release`

use asdomain_core::PlatformFamily;
use std::path::Path;

pub const OS_RELEASE: &str = "/etc/os-release";

/// Detect the running host's family. Unreadable files yield `Unknown`.
pub fn detect_platform_family() -> PlatformFamily {
    detect_from(Path::new(OS_RELEASE))
}

pub fn detect_from(path: &Path) -> PlatformFamily {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_os_release(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read os-release");
            PlatformFamily::Unknown("unreadable".to_string())
        }
    }
}

pub fn parse_os_release(content: &str) -> PlatformFamily {
    let mut id = None;
    let mut id_like = None;
    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "ID" => id = Some(value.to_string()),
            "ID_LIKE" => id_like = Some(value.to_string()),
            _ => {}
        }
    }
    PlatformFamily::from_os_release(id.as_deref().unwrap_or_default(), id_like.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ubuntu() {
        let content = r#"NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;
        assert_eq!(parse_os_release(content), PlatformFamily::Debian);
    }

    #[test]
    fn test_parse_rocky_via_id_like() {
        let content = "ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n";
        assert_eq!(parse_os_release(content), PlatformFamily::Rhel);

        let content = "ID=\"myos\"\nID_LIKE=\"rhel fedora\"\n";
        assert_eq!(parse_os_release(content), PlatformFamily::Rhel);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            parse_os_release("ID=arch\n"),
            PlatformFamily::Unknown(name) if name == "arch"
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            detect_from(&dir.path().join("os-release")),
            PlatformFamily::Unknown(_)
        ));
    }
}
