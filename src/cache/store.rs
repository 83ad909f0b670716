//! Cache lifecycle: scan, load, staleness check and rebuild.
//!
//! A [`CacheStore`] is used once per run:
//!
//! ```no_run
//! use stacky::cache::CacheStore;
//!
//! let mut store = CacheStore::new("D:/Stacks/Tools");
//! store.scan()?;
//! store.load()?;
//! for entry in store.entries() {
//!     println!("{}", entry.name());
//! }
//! # Ok::<(), stacky::cache::CacheError>(())
//! ```
//!
//! `load()` never fails because of the cache file itself: a missing,
//! truncated, corrupt, foreign-version or outdated file is replaced by a
//! rebuild.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytesize::ByteSize;
use serde::Serialize;

use super::buffer::{is_missing, read_u32_le, ByteBuffer};
use super::entry::{CacheEntry, EntryId};
use super::{CacheError, CacheResult, StalenessPolicy, CACHE_VERSION, VERSION_TAG_SIZE};
use crate::icon::{IconExtractor, DEFAULT_ICON_SIZE};
use crate::platform;
use crate::scanner::{
    absolute_path, resolve_relative, root_entry_name, Conventions, ScanResult, Walker,
};

/// An entry whose icon could not be extracted and got the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedIcon {
    /// Relative entry name
    pub name: String,
    /// Why extraction failed
    pub reason: String,
}

/// What happened during the last rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Entries that fell back to the placeholder icon.
    pub failed_icons: Vec<FailedIcon>,
    /// Set when the cache file could not be written. The in-memory entries
    /// are still valid.
    pub persist_error: Option<String>,
    /// Size of the serialized cache.
    pub bytes: u64,
}

impl RebuildReport {
    /// Whether every icon was extracted and the file was written.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_icons.is_empty() && self.persist_error.is_none()
    }
}

/// Owner of one folder's cache file and entry list.
#[derive(Debug)]
pub struct CacheStore {
    base_path: PathBuf,
    cache_path: PathBuf,
    conventions: Conventions,
    extractor: IconExtractor,
    policy: StalenessPolicy,
    entries: Vec<CacheEntry>,
    scanned: Option<ScanResult>,
    stored_file_modified: Option<SystemTime>,
    was_rebuilt: bool,
    report: Option<RebuildReport>,
}

impl CacheStore {
    /// Store for `base_path` with default conventions, icon size and policy.
    ///
    /// A relative `base_path` is taken from the working directory so that
    /// stored submenu paths are absolute.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        let base_path = absolute_path(base_path.as_ref());
        let conventions = Conventions::default();
        let extractor = IconExtractor::new(DEFAULT_ICON_SIZE, &conventions.override_file_name);
        Self {
            cache_path: base_path.join(&conventions.cache_file_name),
            base_path,
            conventions,
            extractor,
            policy: StalenessPolicy::default(),
            entries: Vec::new(),
            scanned: None,
            stored_file_modified: None,
            was_rebuilt: false,
            report: None,
        }
    }

    /// Replace the naming rules.
    #[must_use]
    pub fn with_conventions(mut self, conventions: Conventions) -> Self {
        self.cache_path = self.base_path.join(&conventions.cache_file_name);
        self.conventions = conventions;
        self
    }

    /// Replace the icon extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: IconExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set how stored names are compared with the scan.
    #[must_use]
    pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Walk the base folder and remember the listing.
    ///
    /// # Errors
    ///
    /// [`CacheError::Scan`] if the folder cannot be enumerated. Nothing from
    /// a failed scan is kept.
    pub fn scan(&mut self) -> CacheResult<()> {
        self.scanned = None;
        let result = Walker::new(&self.base_path, self.conventions.clone()).scan()?;
        self.scanned = Some(result);
        Ok(())
    }

    /// Load the cache file, rebuilding it when it is missing or stale.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotScanned`] before [`CacheStore::scan`]. Problems with
    /// the cache file itself never surface here; they cause a rebuild.
    pub fn load(&mut self) -> CacheResult<()> {
        if self.scanned.is_none() {
            return Err(CacheError::NotScanned);
        }
        self.entries.clear();
        self.was_rebuilt = false;
        self.report = None;

        match self.read_stored() {
            Ok(None) => {
                log::debug!(
                    "Cache is current: {} entries from {}",
                    self.entries.len(),
                    self.cache_path.display()
                );
                return Ok(());
            }
            Ok(Some(reason)) => log::debug!("Rebuilding cache: {reason}"),
            Err(e) => log::warn!("Discarding cache {}: {}", self.cache_path.display(), e),
        }

        self.rebuild()?;
        Ok(())
    }

    /// Read and validate the stored file.
    ///
    /// `Ok(None)` means the stored entries are current and now loaded;
    /// `Ok(Some(reason))` means a rebuild is required.
    fn read_stored(&mut self) -> CacheResult<Option<String>> {
        let mut buffer = ByteBuffer::new();
        if let Err(e) = buffer.load_from_file(&self.cache_path) {
            if is_missing(&e) {
                return Ok(Some("no cache file".to_string()));
            }
            return Err(e);
        }

        let bytes = buffer.as_bytes();
        if bytes.len() < VERSION_TAG_SIZE {
            return Ok(Some(format!("cache file is only {} bytes", bytes.len())));
        }
        let (version, mut pos) = read_u32_le(bytes, 0)?;
        if version != CACHE_VERSION {
            return Ok(Some(format!(
                "cache version {version}, expected {CACHE_VERSION}"
            )));
        }

        let mut entries = Vec::new();
        while pos < bytes.len() {
            let (entry, next) = CacheEntry::deserialize(bytes, pos)?;
            entries.push(entry);
            pos = next;
        }

        let modified = fs::metadata(&self.cache_path)
            .and_then(|m| m.modified())
            .map_err(|source| CacheError::Io {
                path: self.cache_path.clone(),
                source,
            })?;

        self.entries = entries;
        self.stored_file_modified = Some(modified);

        if self.is_outdated() {
            self.entries.clear();
            return Ok(Some("folder changed since the cache was written".to_string()));
        }
        Ok(None)
    }

    /// Whether the loaded entries no longer describe the scanned folder.
    ///
    /// True when nothing was scanned or loaded, when any scanned item is
    /// newer than the cache file, when the entry count differs, when the
    /// root entry names another folder, or when the names differ under the
    /// staleness policy. Different spellings of the same folder, such as a
    /// symlink or a `.` component, count as the same root.
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        let (Some(scanned), Some(stored_modified)) = (&self.scanned, self.stored_file_modified)
        else {
            return true;
        };

        if scanned.max_modified.is_some_and(|m| m > stored_modified) {
            log::trace!("Scanned items are newer than the cache file");
            return true;
        }
        if self.entries.len() != scanned.len() + 1 {
            log::trace!(
                "Entry count {} does not match {} scanned items",
                self.entries.len(),
                scanned.len()
            );
            return true;
        }
        if !same_folder(Path::new(self.entries[0].name()), &self.base_path) {
            log::trace!("Cache was written for {}", self.entries[0].name());
            return true;
        }

        let stored = self.entries[1..].iter().map(CacheEntry::name);
        match self.policy {
            StalenessPolicy::Ordered => !stored.eq(scanned.names.iter().map(String::as_str)),
            StalenessPolicy::Unordered => {
                let mut stored: Vec<&str> = stored.collect();
                let mut names: Vec<&str> = scanned.names.iter().map(String::as_str).collect();
                stored.sort_unstable();
                names.sort_unstable();
                stored != names
            }
        }
    }

    /// Re-extract every icon and rewrite the cache file.
    ///
    /// Icon failures are replaced by the placeholder and listed in the
    /// returned report, as is a failure to write the file.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotScanned`] before [`CacheStore::scan`].
    pub fn rebuild(&mut self) -> CacheResult<&RebuildReport> {
        let scanned = self.scanned.as_ref().ok_or(CacheError::NotScanned)?;
        let mut report = RebuildReport::default();
        let mut buffer = ByteBuffer::new();
        buffer.append_u32(CACHE_VERSION);

        let mut entries = Vec::with_capacity(scanned.len() + 1);
        let root = self.populate(
            &root_entry_name(&self.base_path),
            &self.base_path,
            &mut report,
        )?;
        root.serialize(&mut buffer);
        entries.push(root);

        for name in &scanned.names {
            let path = resolve_relative(&self.base_path, name);
            let entry = self.populate(name, &path, &mut report)?;
            entry.serialize(&mut buffer);
            entries.push(entry);
        }

        report.bytes = buffer.len() as u64;
        match self.persist(&buffer) {
            Ok(modified) => {
                log::debug!(
                    "Wrote {} entries ({}) to {}",
                    entries.len(),
                    ByteSize::b(report.bytes),
                    self.cache_path.display()
                );
                self.stored_file_modified = modified;
            }
            Err(e) => {
                log::warn!("Cache not saved: {e}");
                report.persist_error = Some(e.to_string());
                self.stored_file_modified = None;
            }
        }

        if !report.failed_icons.is_empty() {
            log::warn!(
                "{} of {} icons fell back to the placeholder",
                report.failed_icons.len(),
                entries.len()
            );
        }

        self.entries = entries;
        self.was_rebuilt = true;
        Ok(&*self.report.insert(report))
    }

    fn populate(&self, name: &str, path: &Path, report: &mut RebuildReport) -> CacheResult<CacheEntry> {
        match CacheEntry::populate_from_path(name, path, &self.extractor, &self.conventions) {
            Err(CacheError::Extract { source, .. }) => {
                log::warn!("No icon for {name}: {source}");
                report.failed_icons.push(FailedIcon {
                    name: name.to_string(),
                    reason: source.to_string(),
                });
                CacheEntry::placeholder(name, path, &self.extractor, &self.conventions)
            }
            other => other,
        }
    }

    /// Replace the cache file and hide it. Returns the new file's mtime.
    fn persist(&self, buffer: &ByteBuffer) -> CacheResult<Option<SystemTime>> {
        let io_error = |source| CacheError::Io {
            path: self.cache_path.clone(),
            source,
        };

        match fs::remove_file(&self.cache_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }
        buffer.save_to_file(&self.cache_path)?;
        platform::mark_hidden(&self.cache_path).map_err(io_error)?;

        Ok(fs::metadata(&self.cache_path)
            .and_then(|m| m.modified())
            .ok())
    }

    /// Entries in cache order; entry 0 is the base folder itself.
    #[must_use]
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Look up an entry by its stable id.
    #[must_use]
    pub fn entry_by_id(&self, id: EntryId) -> Option<&CacheEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Whether the last `load()` had to rebuild.
    #[must_use]
    pub fn was_rebuilt(&self) -> bool {
        self.was_rebuilt
    }

    /// Report of the last rebuild in this run, if any.
    #[must_use]
    pub fn report(&self) -> Option<&RebuildReport> {
        self.report.as_ref()
    }

    /// Listing from the last successful scan.
    #[must_use]
    pub fn scanned(&self) -> Option<&ScanResult> {
        self.scanned.as_ref()
    }

    /// The folder this cache describes.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of the cache file.
    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Naming rules in use.
    #[must_use]
    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Staleness policy in use.
    #[must_use]
    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Absolute path for an entry name. The root entry's name maps to the
    /// base folder, also when it was stored under another spelling.
    #[must_use]
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let is_root = name == root_entry_name(&self.base_path)
            || self.entries.first().is_some_and(|root| root.name() == name);
        if is_root {
            return self.base_path.clone();
        }
        resolve_relative(&self.base_path, name)
    }
}

/// Whether two paths lead to the same folder.
///
/// Compares canonical forms; falls back to plain path equality when either
/// side cannot be resolved.
fn same_folder(stored: &Path, base: &Path) -> bool {
    match (fs::canonicalize(stored), fs::canonicalize(base)) {
        (Ok(stored), Ok(base)) => stored == base,
        _ => stored == base,
    }
}
