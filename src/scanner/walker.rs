//! Directory walker built on [`walkdir`].
//!
//! # Overview
//!
//! [`Walker::scan`] lists a launcher folder depth-first, descending only into
//! submenu folders. Each listed item's modification time is folded into a
//! running maximum that the cache later compares against its own file time.
//!
//! The listing order is whatever the filesystem returns. It is deliberately
//! not sorted: the cache stores entries in this order and treats a different
//! order as a change.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use super::{Conventions, ScanError, ScanResult, NAME_SEPARATOR};
use crate::platform;

/// Directory walker for launcher folders.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Naming rules
    conventions: Conventions,
}

impl Walker {
    /// Create a new walker for the given folder.
    #[must_use]
    pub fn new(path: &Path, conventions: Conventions) -> Self {
        Self {
            root: path.to_path_buf(),
            conventions,
        }
    }

    /// The folder being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the folder and collect entry names in listing order.
    ///
    /// # Errors
    ///
    /// Any enumeration or metadata failure aborts the whole scan; a partial
    /// listing would make the staleness check meaningless.
    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        self.check_root()?;

        let mut result = ScanResult::default();
        let mut it = WalkDir::new(&self.root).min_depth(1).into_iter();

        while let Some(next) = it.next() {
            let entry = next.map_err(|e| self.handle_walk_error(e))?;
            let is_dir = entry.file_type().is_dir();
            let file_name = entry.file_name().to_string_lossy();

            let metadata = entry.metadata().map_err(|e| self.handle_walk_error(e))?;

            if self.conventions.is_excluded_name(&file_name) || platform::is_hidden(&metadata) {
                log::trace!("Skipping: {}", entry.path().display());
                if is_dir {
                    it.skip_current_dir();
                }
                continue;
            }

            let name = self.relative_name(entry.path());
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            result.max_modified = Some(match result.max_modified {
                Some(current) if current >= modified => current,
                _ => modified,
            });

            if is_dir && !self.conventions.is_submenu_name(&file_name) {
                // Plain folders are launchable items, not menus
                it.skip_current_dir();
            }

            log::trace!("Scanned: {}", name);
            result.names.push(name);
        }

        log::debug!(
            "Scanned {} entries under {}",
            result.names.len(),
            self.root.display()
        );
        Ok(result)
    }

    fn check_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ScanError::NotFound(self.root.clone())),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(ScanError::PermissionDenied(self.root.clone()))
            }
            Err(source) => Err(ScanError::Io {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Relative name of `path`, levels joined with [`NAME_SEPARATOR`].
    fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut name = String::new();
        for component in relative.components() {
            if !name.is_empty() {
                name.push(NAME_SEPARATOR);
            }
            name.push_str(&component.as_os_str().to_string_lossy());
        }
        name
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::warn!("Walker error for {}: {}", path.display(), error);

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
            Some(ErrorKind::NotFound) => ScanError::NotFound(path),
            _ => ScanError::Io {
                path,
                source: error.into(),
            },
        }
    }
}
