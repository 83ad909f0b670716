//! Conversion of decoded icons into cache pixel format.
//!
//! Cache bitmaps are 32 bpp BGRA, top-down, with premultiplied alpha. The
//! converter owns a premultiplication lookup table that is built on the first
//! conversion and reused for every icon after that.

use std::borrow::Cow;
use std::cell::OnceCell;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::IconPixels;

/// Converts decoded RGBA images to premultiplied BGRA at a fixed size.
#[derive(Debug, Default)]
pub struct IconConverter {
    /// `table[a << 8 | c]` is `c * a / 255`, rounded
    premultiply: OnceCell<Box<[u8]>>,
}

impl IconConverter {
    /// Create a converter. The lookup table is built lazily.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lookup table has been built yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.premultiply.get().is_some()
    }

    fn table(&self) -> &[u8] {
        self.premultiply.get_or_init(|| {
            log::trace!("Building premultiply table");
            (0..=255u32)
                .flat_map(|a| (0..=255u32).map(move |c| ((c * a + 127) / 255) as u8))
                .collect()
        })
    }

    /// Resize `image` to `size` x `size` if needed, premultiply and swizzle.
    #[must_use]
    pub fn convert(&self, image: &RgbaImage, size: u32) -> IconPixels {
        let image = if image.dimensions() == (size, size) {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(imageops::resize(image, size, size, FilterType::Lanczos3))
        };

        let table = self.table();
        let mut bgra = Vec::with_capacity(image.as_raw().len());
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            let row = usize::from(a) << 8;
            bgra.extend_from_slice(&[
                table[row | usize::from(b)],
                table[row | usize::from(g)],
                table[row | usize::from(r)],
                a,
            ]);
        }

        IconPixels {
            width: size,
            height: size,
            bgra,
        }
    }
}
