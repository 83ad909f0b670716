//! Platform-specific file attribute handling.
//!
//! Windows has a real "hidden" attribute: the scanner honors it and the cache
//! file is marked with it after every rebuild. Other platforms have no such
//! attribute; dot-files stay visible there because `.separator` entries are
//! content, and the cache file is excluded by name instead.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Whether the filesystem marks this entry as hidden.
#[cfg(windows)]
#[must_use]
pub fn is_hidden(metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    use windows::Win32::Storage::FileSystem::FILE_ATTRIBUTE_HIDDEN;

    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN.0 != 0
}

/// Whether the filesystem marks this entry as hidden.
#[cfg(not(windows))]
#[must_use]
pub fn is_hidden(_metadata: &Metadata) -> bool {
    false
}

/// Set the hidden attribute on `path`, keeping its other attributes.
#[cfg(windows)]
pub fn mark_hidden(path: &Path) -> io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use std::os::windows::fs::MetadataExt;
    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::{
        SetFileAttributesW, FILE_ATTRIBUTE_HIDDEN, FILE_FLAGS_AND_ATTRIBUTES,
    };

    let current = std::fs::metadata(path)?.file_attributes();
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: `wide` is a valid null-terminated UTF-16 string that outlives the call.
    unsafe {
        SetFileAttributesW(
            PCWSTR(wide.as_ptr()),
            FILE_FLAGS_AND_ATTRIBUTES(current | FILE_ATTRIBUTE_HIDDEN.0),
        )
    }
    .map_err(|e| io::Error::other(e.to_string()))
}

/// Set the hidden attribute on `path`. No-op where the attribute does not exist.
#[cfg(not(windows))]
pub fn mark_hidden(path: &Path) -> io::Result<()> {
    log::trace!("No hidden attribute on this platform: {}", path.display());
    Ok(())
}
