// src/filesystem/deployer.rs

//! Materialization of package entries onto a target directory
//!
//! Every write goes through a temporary file in the destination directory
//! followed by a rename, so an interrupted install never leaves a truncated
//! file behind under its final name.

use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes and removes entries below one target root
pub struct FileDeployer {
    root: PathBuf,
}

impl FileDeployer {
    /// Create a deployer, creating the root if it doesn't exist
    pub fn new(root: &Path) -> Result<Self> {
        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
            debug!("Created target root: {}", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_path(&self, path: &PkgPath) -> PathBuf {
        path.to_fs_path(&self.root)
    }

    /// Ensure a directory exists, replacing a non-directory in its way
    pub fn deploy_directory(&self, path: &PkgPath) -> Result<()> {
        let target = self.target_path(path);
        if let Ok(meta) = fs::symlink_metadata(&target)
            && !meta.is_dir()
        {
            fs::remove_file(&target).map_err(|e| Error::io(&target, e))?;
        }
        fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        debug!("Deployed directory: {}", path);
        Ok(())
    }

    /// Write file content, replacing whatever file is there
    pub fn deploy_bytes(&self, path: &PkgPath, data: &[u8], mode: Option<u32>) -> Result<()> {
        let target = self.target_path(path);
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;

        if target.is_dir() {
            return Err(Error::io(
                &target,
                io::Error::new(io::ErrorKind::AlreadyExists, "a directory is in the way"),
            ));
        }

        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| Error::io(&parent, e))?;
        temp.write_all(data).map_err(|e| Error::io(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| Error::io(temp.path(), e))?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io(temp.path(), e))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        temp.persist(&target).map_err(|e| Error::io(&target, e.error))?;
        debug!("Deployed file: {} ({} bytes)", path, data.len());
        Ok(())
    }

    /// Remove a file; `Ok(false)` if it was already gone
    pub fn remove_file(&self, path: &PkgPath) -> Result<bool> {
        let target = self.target_path(path);
        match fs::remove_file(&target) {
            Ok(()) => {
                info!("Removed file: {}", path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("File already removed: {}", path);
                Ok(false)
            }
            Err(e) => Err(Error::io(&target, e)),
        }
    }

    /// Remove an empty directory; `Ok(false)` if it was already gone
    ///
    /// A directory that still has content is an error, left for the caller
    /// to report.
    pub fn remove_directory(&self, path: &PkgPath) -> Result<bool> {
        let target = self.target_path(path);
        match fs::remove_dir(&target) {
            Ok(()) => {
                info!("Removed directory: {}", path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Directory already removed: {}", path);
                Ok(false)
            }
            Err(e) => Err(Error::io(&target, e)),
        }
    }
}
