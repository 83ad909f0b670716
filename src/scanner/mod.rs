//! Scanner module for discovering menu entries in a launcher folder.
//!
//! Only folders whose name ends in `.submenu` are descended into; every other
//! item (files and ordinary folders alike) becomes a flat entry. Entry names
//! are relative to the base folder, with one `\` between levels, and keep the
//! order the filesystem reports them in.
//!
//! # Example
//!
//! ```no_run
//! use stacky::scanner::{Conventions, Walker};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("D:/Stacks/Tools"), Conventions::default());
//! let scan = walker.scan()?;
//! for name in &scan.names {
//!     println!("{name}");
//! }
//! # Ok::<(), stacky::scanner::ScanError>(())
//! ```

pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cache::CACHE_FILE_NAME;

pub use walker::Walker;

/// Separator between hierarchy levels in entry names.
///
/// Fixed regardless of platform so cache files stay portable.
pub const NAME_SEPARATOR: char = '\\';

/// Naming rules that drive the scan and the menu layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    /// Folders ending with this are scanned recursively and shown as submenus.
    pub submenu_suffix: String,
    /// Items ending with this are left out entirely.
    pub ignore_suffix: String,
    /// Per-folder configuration file (icon override), never listed.
    pub override_file_name: String,
    /// The cache file, never listed.
    pub cache_file_name: String,
    /// Items named like this (optionally plus the shortcut extension) render
    /// as separators.
    pub separator_marker: String,
    /// Shortcut extension stripped before separator detection.
    pub shortcut_extension: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            submenu_suffix: ".submenu".to_string(),
            ignore_suffix: ".ignore".to_string(),
            override_file_name: "desktop.ini".to_string(),
            cache_file_name: CACHE_FILE_NAME.to_string(),
            separator_marker: ".separator".to_string(),
            shortcut_extension: ".lnk".to_string(),
        }
    }
}

impl Conventions {
    /// Whether a file name marks a submenu folder.
    #[must_use]
    pub fn is_submenu_name(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.submenu_suffix)
    }

    /// Whether a file name is excluded from scanning, before looking at
    /// filesystem attributes.
    #[must_use]
    pub fn is_excluded_name(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.ignore_suffix)
            || file_name.eq_ignore_ascii_case(&self.override_file_name)
            || file_name.eq_ignore_ascii_case(&self.cache_file_name)
    }

    /// Whether an entry name (any level) is a separator marker.
    #[must_use]
    pub fn is_separator_name(&self, name: &str) -> bool {
        let leaf = leaf_name(name);
        let leaf = leaf
            .strip_suffix(self.shortcut_extension.as_str())
            .unwrap_or(leaf);
        leaf.ends_with(&self.separator_marker)
    }
}

/// Result of a directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Relative entry names in scan order.
    pub names: Vec<String>,
    /// Newest modification time over all listed entries, if any.
    pub max_modified: Option<SystemTime>,
}

impl ScanResult {
    /// Number of scanned entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the scan found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Last level of an entry name.
#[must_use]
pub fn leaf_name(name: &str) -> &str {
    name.rsplit(NAME_SEPARATOR).next().unwrap_or(name)
}

/// Map a relative entry name back to an absolute path under `base`.
#[must_use]
pub fn resolve_relative(base: &Path, name: &str) -> PathBuf {
    name.split(NAME_SEPARATOR)
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |path, part| path.join(part))
}

/// Normalize a base path as typed by the user: surrounding quotes and
/// trailing separators are removed and relative paths are made absolute.
#[must_use]
pub fn normalize_base_path(raw: &str) -> PathBuf {
    let unquoted = raw.trim().trim_matches('"');
    absolute_path(Path::new(trim_trailing_separators(unquoted)))
}

/// `path` joined onto the working directory when relative.
///
/// Symlinks are not resolved. A path that cannot be made absolute (empty,
/// or no working directory) is returned unchanged.
#[must_use]
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|e| {
        log::debug!("Cannot make {} absolute: {}", path.display(), e);
        path.to_path_buf()
    })
}

/// Display form of the base path, used as the root entry's name.
#[must_use]
pub fn root_entry_name(base: &Path) -> String {
    trim_trailing_separators(&base.to_string_lossy()).to_string()
}

fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() || trimmed.ends_with(':') {
        // "/" or "C:\" keep their separator
        &path[..(trimmed.len() + 1).min(path.len())]
    } else {
        trimmed
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
