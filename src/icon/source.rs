//! Portable icon source backed by the `image` crate.
//!
//! Image files (`.ico`, `.png`, `.bmp`, `.gif`) are decoded and used as their
//! own icon; every other entry gets a stock glyph for its kind. Icon resources
//! inside executables and DLLs are left to the Windows shell source, so here
//! overrides that point at them fail and the caller falls back to the default
//! lookup.

use std::path::Path;

use image::{ImageError, RgbaImage};

use super::override_file::IconLocation;
use super::stock::StockIcon;
use super::{EntryKind, ExtractError, IconSource};

/// Extensions decoded as images.
const IMAGE_EXTENSIONS: &[&str] = &["ico", "png", "bmp", "gif"];

/// Icon source that decodes image files and falls back to stock glyphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageIconSource;

impl ImageIconSource {
    /// Create the source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn decode(path: &Path) -> Result<RgbaImage, ExtractError> {
        image::open(path)
            .map(|image| image.to_rgba8())
            .map_err(|e| match e {
                ImageError::IoError(source) => ExtractError::Io {
                    path: path.to_path_buf(),
                    source,
                },
                source => ExtractError::Decode {
                    path: path.to_path_buf(),
                    source,
                },
            })
    }
}

/// Whether the path has an extension this source decodes.
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

impl IconSource for ImageIconSource {
    fn load_location(&self, location: &IconLocation, _size: u32) -> Result<RgbaImage, ExtractError> {
        if !is_image_path(&location.path) {
            return Err(ExtractError::Unsupported(location.path.clone()));
        }
        if location.index != 0 {
            log::trace!(
                "Ignoring icon index {} for {}",
                location.index,
                location.path.display()
            );
        }
        Self::decode(&location.path)
    }

    fn default_icon(&self, path: &Path, kind: EntryKind, size: u32) -> Result<RgbaImage, ExtractError> {
        let stock = match kind {
            EntryKind::Directory { submenu: true } => StockIcon::Submenu,
            EntryKind::Directory { submenu: false } => StockIcon::Folder,
            EntryKind::File if is_image_path(path) => match Self::decode(path) {
                Ok(image) => return Ok(image),
                Err(e) => {
                    log::debug!("Using stock icon for {}: {}", path.display(), e);
                    StockIcon::Document
                }
            },
            EntryKind::File => StockIcon::for_file(path),
        };
        Ok(stock.render(size))
    }
}
