//! Icon extraction pipeline.
//!
//! For every cache entry the [`IconExtractor`]:
//!
//! 1. for folders only, looks for an override file and loads the icon it names
//! 2. otherwise (or when the override fails) asks the [`IconSource`] for the
//!    default icon of the path
//! 3. converts the result to premultiplied BGRA at the configured size
//!
//! The source is a trait. On Windows the default is the shell-backed
//! `ShellIconSource`; elsewhere it is [`ImageIconSource`].

pub mod convert;
pub mod override_file;
pub mod shell;
pub mod source;
pub mod stock;

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::cache::{CacheError, CacheResult, IconBitmap};

pub use convert::IconConverter;
pub use override_file::IconLocation;
#[cfg(windows)]
pub use shell::ShellIconSource;
pub use source::ImageIconSource;
pub use stock::StockIcon;

/// Edge length of menu icons in pixels.
pub const DEFAULT_ICON_SIZE: u32 = 16;

/// What kind of filesystem item an icon is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A folder; `submenu` when it carries the submenu suffix
    Directory {
        /// Whether the folder is a submenu
        submenu: bool,
    },
    /// Anything that is not a folder
    File,
}

/// Converted icon pixels: top-down rows, 32 bpp premultiplied BGRA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconPixels {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height * 4` bytes
    pub bgra: Vec<u8>,
}

impl IconPixels {
    /// Wrap the pixels in a cache bitmap (negative height: top-down).
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidBitmap`] if the height does not fit the BMP
    /// header or the buffer does not match the geometry.
    pub fn into_bitmap(self) -> CacheResult<IconBitmap> {
        let height = i32::try_from(self.height).map_err(|_| {
            CacheError::InvalidBitmap(format!("height {} is too large", self.height))
        })?;
        IconBitmap::from_pixels(&self.bgra, self.width, -height)
    }
}

/// Errors raised while resolving or decoding an icon.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The folder declares no icon override.
    #[error("No icon override in {0}")]
    NoOverride(PathBuf),

    /// The override file could not be parsed.
    #[error("Invalid override file {path}: {reason}")]
    InvalidOverride {
        /// Path of the override file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// An I/O error occurred while reading icon data.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The icon file could not be decoded.
    #[error("Cannot decode icon {path}: {source}")]
    Decode {
        /// Path of the icon file
        path: PathBuf,
        /// The decoder error
        #[source]
        source: image::ImageError,
    },

    /// The source cannot read icons from this kind of file.
    #[error("Unsupported icon source: {0}")]
    Unsupported(PathBuf),

    /// The shell produced no usable icon.
    #[error("Shell icon lookup failed for {path}: {reason}")]
    Shell {
        /// Path the icon was requested for
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

/// Provider of raw icon images.
pub trait IconSource {
    /// Load the icon an override points at.
    fn load_location(&self, location: &IconLocation, size: u32) -> Result<RgbaImage, ExtractError>;

    /// Default icon lookup for a path.
    fn default_icon(&self, path: &Path, kind: EntryKind, size: u32) -> Result<RgbaImage, ExtractError>;
}

/// Runs the override-then-default pipeline and converts the result.
pub struct IconExtractor {
    source: Box<dyn IconSource>,
    converter: IconConverter,
    size: u32,
    override_file_name: String,
}

impl std::fmt::Debug for IconExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconExtractor")
            .field("converter", &self.converter)
            .field("size", &self.size)
            .field("override_file_name", &self.override_file_name)
            .finish_non_exhaustive()
    }
}

impl IconExtractor {
    /// Extractor using the platform's default source.
    #[must_use]
    pub fn new(size: u32, override_file_name: &str) -> Self {
        Self::with_source(default_source(), size, override_file_name)
    }

    /// Extractor using a custom icon source.
    #[must_use]
    pub fn with_source(source: Box<dyn IconSource>, size: u32, override_file_name: &str) -> Self {
        Self {
            source,
            converter: IconConverter::new(),
            size: size.max(1),
            override_file_name: override_file_name.to_string(),
        }
    }

    /// Icon edge length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Extract and convert the icon for `path`.
    ///
    /// # Errors
    ///
    /// Returns the default lookup's error; override failures only fall
    /// through to the default lookup.
    pub fn extract(&self, path: &Path, kind: EntryKind) -> Result<IconPixels, ExtractError> {
        if let EntryKind::Directory { .. } = kind {
            match self.extract_override(path) {
                Ok(pixels) => return Ok(pixels),
                Err(ExtractError::NoOverride(_)) => {}
                Err(e) => log::warn!("Icon override ignored for {}: {}", path.display(), e),
            }
        }

        let image = self.source.default_icon(path, kind, self.size)?;
        Ok(self.converter.convert(&image, self.size))
    }

    /// Icon used in place of one that could not be extracted.
    #[must_use]
    pub fn placeholder(&self) -> IconPixels {
        self.converter
            .convert(&StockIcon::Missing.render(self.size), self.size)
    }

    fn extract_override(&self, folder: &Path) -> Result<IconPixels, ExtractError> {
        let location = override_file::read_override(folder, &self.override_file_name)?
            .ok_or_else(|| ExtractError::NoOverride(folder.to_path_buf()))?;
        let image = self.source.load_location(&location, self.size)?;
        Ok(self.converter.convert(&image, self.size))
    }
}

#[cfg(windows)]
fn default_source() -> Box<dyn IconSource> {
    Box::new(ShellIconSource::new())
}

#[cfg(not(windows))]
fn default_source() -> Box<dyn IconSource> {
    Box::new(ImageIconSource::new())
}
