//! Cache entry definitions.
//!
//! On disk an entry is, with no length prefix:
//!
//! ```text
//! name          UTF-16LE, null-terminated
//! is_submenu    1 byte, non-zero = true
//! submenu_path  UTF-16LE, null-terminated, only when is_submenu
//! bitmap        14 + 40 byte headers, then the payload
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::bitmap::IconBitmap;
use super::buffer::{read_u8, read_wide_str, ByteBuffer};
use super::{CacheError, CacheResult};
use crate::icon::{EntryKind, IconExtractor};
use crate::scanner::{leaf_name, Conventions};

/// Stable identifier of an entry, derived from its name.
///
/// Unlike a list position it survives reordering and insertion of other
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntryId(u64);

impl EntryId {
    /// First 8 bytes of the BLAKE3 hash of `name`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_be_bytes(bytes))
    }

    /// Raw value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EntryId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One scanned filesystem item with its extracted icon.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    id: EntryId,
    name: String,
    is_submenu: bool,
    submenu_path: Option<PathBuf>,
    icon: IconBitmap,
}

impl CacheEntry {
    /// Build an entry for `name` located at `path`, extracting its icon.
    ///
    /// # Errors
    ///
    /// [`CacheError::Extract`] when no icon could be captured. The caller
    /// decides whether to fall back to [`CacheEntry::placeholder`].
    pub fn populate_from_path(
        name: &str,
        path: &Path,
        extractor: &IconExtractor,
        conventions: &Conventions,
    ) -> CacheResult<Self> {
        let kind = entry_kind(name, path, conventions);
        let pixels = extractor
            .extract(path, kind)
            .map_err(|source| CacheError::Extract {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_icon(name, path, kind, pixels.into_bitmap()?)
    }

    /// Build an entry carrying the placeholder icon.
    ///
    /// Used after [`CacheEntry::populate_from_path`] failed so the entry list
    /// keeps its shape.
    pub fn placeholder(
        name: &str,
        path: &Path,
        extractor: &IconExtractor,
        conventions: &Conventions,
    ) -> CacheResult<Self> {
        let kind = entry_kind(name, path, conventions);
        Self::with_icon(name, path, kind, extractor.placeholder().into_bitmap()?)
    }

    /// Assemble an entry from an already built icon.
    ///
    /// The entry is a submenu exactly when `submenu_path` is present.
    #[must_use]
    pub fn from_parts(name: &str, submenu_path: Option<PathBuf>, icon: IconBitmap) -> Self {
        Self {
            id: EntryId::from_name(name),
            name: name.to_string(),
            is_submenu: submenu_path.is_some(),
            submenu_path,
            icon,
        }
    }

    fn with_icon(name: &str, path: &Path, kind: EntryKind, icon: IconBitmap) -> CacheResult<Self> {
        let is_submenu = matches!(kind, EntryKind::Directory { submenu: true });
        Ok(Self::from_parts(name, is_submenu.then(|| path.to_path_buf()), icon))
    }

    /// Append the entry record.
    pub fn serialize(&self, buffer: &mut ByteBuffer) {
        buffer.append_str(&self.name, true);
        buffer.append(&[u8::from(self.is_submenu)]);
        if let Some(path) = &self.submenu_path {
            buffer.append_str(&path.to_string_lossy(), true);
        }
        self.icon.serialize_into(buffer);
    }

    /// Read one entry record at `offset`, returning it and the offset just
    /// past it.
    ///
    /// # Errors
    ///
    /// [`CacheError::CorruptData`] if the record is truncated or malformed.
    pub fn deserialize(buf: &[u8], offset: usize) -> CacheResult<(Self, usize)> {
        let (name, pos) = read_wide_str(buf, offset)?;
        let (flag, pos) = read_u8(buf, pos)?;
        let is_submenu = flag != 0;

        let (submenu_path, pos) = if is_submenu {
            let (path, pos) = read_wide_str(buf, pos)?;
            (Some(PathBuf::from(path)), pos)
        } else {
            (None, pos)
        };

        let (icon, pos) = IconBitmap::from_bytes(buf, pos)?;

        let entry = Self {
            id: EntryId::from_name(&name),
            name,
            is_submenu,
            submenu_path,
            icon,
        };
        Ok((entry, pos))
    }

    /// Stable identifier.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Relative name, levels separated by `\`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last level of the name.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        leaf_name(&self.name)
    }

    /// Whether this is a submenu folder.
    #[must_use]
    pub fn is_submenu(&self) -> bool {
        self.is_submenu
    }

    /// Absolute path of the submenu folder, present only for submenus.
    #[must_use]
    pub fn submenu_path(&self) -> Option<&Path> {
        self.submenu_path.as_deref()
    }

    /// The entry's icon.
    #[must_use]
    pub fn icon(&self) -> &IconBitmap {
        &self.icon
    }

    /// Serialized record size in bytes.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        let wide = |s: &str| (s.encode_utf16().count() + 1) * 2;
        wide(&self.name)
            + 1
            + self
                .submenu_path
                .as_deref()
                .map_or(0, |p| wide(&p.to_string_lossy()))
            + self.icon.total_size()
    }
}

/// Directory or file, and whether the directory is a submenu.
///
/// Paths that cannot be inspected are treated as files.
fn entry_kind(name: &str, path: &Path, conventions: &Conventions) -> EntryKind {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => EntryKind::Directory {
            submenu: conventions.is_submenu_name(leaf_name(name)),
        },
        Ok(_) => EntryKind::File,
        Err(e) => {
            log::debug!("Cannot stat {}: {}", path.display(), e);
            EntryKind::File
        }
    }
}
