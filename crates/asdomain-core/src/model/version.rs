//! Product version and version-gated compatibility fixes

use crate::error::{CoreError, Result};
use std::fmt;
use std::str::FromStr;

/// Parsed application-server version, e.g. `4.1.152` or `5.2022.5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub build: Option<u32>,
    raw: String,
}

impl ProductVersion {
    pub fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        let raw = match patch {
            Some(p) => format!("{major}.{minor}.{p}"),
            None => format!("{major}.{minor}"),
        };
        Self {
            major,
            minor,
            patch,
            build: None,
            raw,
        }
    }

    /// The version string as it was written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compatibility fixes that must run after domain creation for this version.
    pub fn compat_shims(&self) -> Vec<CompatShim> {
        COMPAT_SHIMS
            .iter()
            .filter(|(range, _)| range.contains(self))
            .map(|(_, shim)| *shim)
            .collect()
    }
}

impl FromStr for ProductVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(CoreError::InvalidVersion(s.to_string()));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            let n = part
                .parse::<u32>()
                .map_err(|_| CoreError::InvalidVersion(s.to_string()))?;
            numbers.push(n);
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers.get(2).copied(),
            build: numbers.get(3).copied(),
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A fix applied after domain creation on specific version lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatShim {
    /// 4.x writes `master-password` under `config/`; the domain expects it at the top level.
    RelocateMasterPassword,
}

/// Inclusive range of major versions.
#[derive(Debug, Clone, Copy)]
pub struct VersionRange {
    pub major_from: u32,
    pub major_to: u32,
}

impl VersionRange {
    pub const fn major(major: u32) -> Self {
        Self {
            major_from: major,
            major_to: major,
        }
    }

    pub fn contains(&self, version: &ProductVersion) -> bool {
        version.major >= self.major_from && version.major <= self.major_to
    }
}

const COMPAT_SHIMS: &[(VersionRange, CompatShim)] =
    &[(VersionRange::major(4), CompatShim::RelocateMasterPassword)];
