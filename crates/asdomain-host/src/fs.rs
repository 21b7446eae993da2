//! Local filesystem
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash never leaves a half-written config or unit file. Every mutation
//! reports whether content, mode or ownership actually changed.

use crate::error::HostError;
use crate::ids::{gid_of, uid_of};
use asdomain_converge::{FileAttrs, FileSystem, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Apply ownership and mode; returns whether anything changed.
pub(crate) async fn apply_attrs(path: &Path, attrs: &FileAttrs) -> Result<bool> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| HostError::io(path, e))?;
    let mut changed = false;

    if let Some(mode) = attrs.mode
        && metadata.mode() & 0o7777 != mode
    {
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| HostError::io(path, e))?;
        changed = true;
    }

    let uid = attrs.owner.as_deref().map(uid_of).transpose()?;
    let gid = attrs.group.as_deref().map(gid_of).transpose()?;
    let uid = uid.filter(|u| *u != metadata.uid());
    let gid = gid.filter(|g| *g != metadata.gid());
    if uid.is_some() || gid.is_some() {
        std::os::unix::fs::chown(path, uid, gid).map_err(|e| HostError::io(path, e))?;
        changed = true;
    }

    Ok(changed)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.asdomain-tmp"))
}

/// Write `content` atomically, creating the file with `create_mode`.
pub(crate) async fn write_atomic(path: &Path, content: &[u8], create_mode: u32) -> Result<()> {
    let tmp = temp_sibling(path);
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(create_mode)
        .open(&tmp)
        .await
        .map_err(|e| HostError::io(&tmp, e))?;
    file.write_all(content)
        .await
        .map_err(|e| HostError::io(&tmp, e))?;
    file.sync_all().await.map_err(|e| HostError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path)
        .await
        .map_err(|e| HostError::io(path, e))?;
    Ok(())
}

/// Current content, `None` when the file does not exist.
pub(crate) async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HostError::io(path, e).into()),
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path)
            .await
            .map_err(|e| HostError::io(path, e))?)
    }

    async fn write(&self, path: &Path, content: &[u8], attrs: &FileAttrs) -> Result<bool> {
        let existing = read_existing(path).await?;
        let content_changed = existing.as_deref() != Some(content);
        if content_changed {
            write_atomic(path, content, attrs.mode.unwrap_or(0o644)).await?;
            tracing::debug!(path = %path.display(), "Wrote file");
        }
        let attrs_changed = apply_attrs(path, attrs).await?;
        Ok(content_changed || attrs_changed)
    }

    async fn copy(&self, from: &Path, to: &Path, attrs: &FileAttrs) -> Result<bool> {
        fs::copy(from, to)
            .await
            .map_err(|e| HostError::io(from, e))?;
        apply_attrs(to, attrs).await?;
        Ok(true)
    }

    async fn create_dir(&self, path: &Path, attrs: &FileAttrs, recursive: bool) -> Result<bool> {
        let created = if fs::try_exists(path)
            .await
            .map_err(|e| HostError::io(path, e))?
        {
            false
        } else {
            let result = if recursive {
                fs::create_dir_all(path).await
            } else {
                fs::create_dir(path).await
            };
            result.map_err(|e| HostError::io(path, e))?;
            true
        };
        let attrs_changed = apply_attrs(path, attrs).await?;
        Ok(created || attrs_changed)
    }

    async fn remove_file(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HostError::io(path, e).into()),
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HostError::io(path, e).into()),
        }
    }
}
