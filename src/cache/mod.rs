//! Icon and metadata cache for a launcher folder.
//!
//! The cache is a single binary file (`!stacky.cache`) kept inside the folder
//! it describes. It stores every scanned entry together with its already
//! extracted icon, so opening the menu a second time needs no icon work at
//! all.
//!
//! # Architecture
//!
//! * [`buffer`]: append-only byte arena plus bounds-checked readers.
//! * [`bitmap`]: one icon as a BMP header pair and premultiplied pixels.
//! * [`entry`]: one scanned item (name, submenu flag, icon).
//! * [`store`]: scan, load, staleness check and rebuild.
//!
//! # Cache Invalidation
//!
//! The file is thrown away and rebuilt when any of these hold:
//! * the version tag differs from [`CACHE_VERSION`]
//! * any scanned entry is newer than the cache file
//! * the stored entry names differ from the scanned names (see
//!   [`StalenessPolicy`])
//! * the file cannot be decoded

pub mod bitmap;
pub mod buffer;
pub mod entry;
pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::icon::ExtractError;
use crate::scanner::ScanError;

pub use bitmap::IconBitmap;
pub use buffer::ByteBuffer;
pub use entry::{CacheEntry, EntryId};
pub use store::{CacheStore, RebuildReport};

/// Format version written at the start of every cache file.
///
/// Bump this whenever any record layout changes. Files carrying another
/// version are discarded, never migrated.
pub const CACHE_VERSION: u32 = 9;

/// Name of the cache file inside the base directory.
pub const CACHE_FILE_NAME: &str = "!stacky.cache";

/// Size of the version tag at the start of the file.
pub const VERSION_TAG_SIZE: usize = 4;

/// How stored entry names are compared against a fresh scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessPolicy {
    /// Names must match position by position. A pure reorder rebuilds.
    #[default]
    Ordered,
    /// Names must match as a set; order is ignored.
    Unordered,
}

/// Errors raised by the cache engine.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache data.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but has no content.
    #[error("Cache file is empty: {0}")]
    EmptyFile(PathBuf),

    /// The cache data is truncated or malformed.
    #[error("Corrupt cache data at byte {offset}: {reason}")]
    CorruptData {
        /// Offset of the record that failed to decode
        offset: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Pixel data does not match the declared bitmap geometry.
    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),

    /// `load()` or `rebuild()` was called before `scan()`.
    #[error("Directory has not been scanned yet")]
    NotScanned,

    /// No icon could be captured for an entry.
    #[error("Icon extraction failed for {path}: {source}")]
    Extract {
        /// Absolute path of the entry
        path: PathBuf,
        /// Why extraction failed
        #[source]
        source: ExtractError,
    },

    /// The directory scan failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl CacheError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
