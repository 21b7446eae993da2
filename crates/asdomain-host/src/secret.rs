//! Credential file writer

use crate::fs::{apply_attrs, read_existing, write_atomic};
use asdomain_converge::{FileAttrs, Result, SecretFileWriter};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

/// Mode used when the caller does not ask for one.
pub const SECRET_FILE_MODE: u32 = 0o600;

#[derive(Debug, Default, Clone)]
pub struct LocalSecretWriter;

impl LocalSecretWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretFileWriter for LocalSecretWriter {
    async fn write_secret(
        &self,
        path: &Path,
        content: &SecretString,
        attrs: &FileAttrs,
    ) -> Result<bool> {
        let attrs = FileAttrs {
            mode: Some(attrs.mode.unwrap_or(SECRET_FILE_MODE)),
            ..attrs.clone()
        };
        let bytes = content.expose_secret().as_bytes();

        let existing = read_existing(path).await?;
        let content_changed = existing.as_deref() != Some(bytes);
        if content_changed {
            // Created with the final mode so the secret is never readable by others.
            write_atomic(path, bytes, SECRET_FILE_MODE).await?;
            tracing::debug!(path = %path.display(), "Wrote credentials file");
        }
        let attrs_changed = apply_attrs(path, &attrs).await?;
        Ok(content_changed || attrs_changed)
    }
}
