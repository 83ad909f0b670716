//! Icon bitmaps in classic BMP layout.
//!
//! Each icon is stored as a `BITMAPFILEHEADER` (14 bytes), a
//! `BITMAPINFOHEADER` (40 bytes) and a 32 bpp BGRA payload with premultiplied
//! alpha. The file header's `total_size` is the only length information in the
//! cache for this record: readers derive the payload size from it.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::buffer::{read_bytes, read_i32_le, read_u16_le, read_u32_le, ByteBuffer};
use super::{CacheError, CacheResult};

/// Size of the serialized file header.
pub const FILE_HEADER_SIZE: usize = 14;
/// Size of the serialized info header.
pub const INFO_HEADER_SIZE: usize = 40;
/// Both headers together; also the pixel data offset.
pub const HEADERS_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

/// "BM" read as a little-endian `u16`.
const BMP_SIGNATURE: u16 = 0x4d42;
const BITS_PER_PIXEL: u16 = 32;
const BYTES_PER_PIXEL: usize = 4;
/// Uncompressed RGB(A).
const BI_RGB: u32 = 0;

/// `BITMAPFILEHEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// Signature, always "BM" for bitmaps we write
    pub kind: u16,
    /// Total serialized size: headers plus payload
    pub total_size: u32,
    /// Reserved, zero
    pub reserved1: u16,
    /// Reserved, zero
    pub reserved2: u16,
    /// Offset of the pixel data from the start of the file header
    pub pixel_offset: u32,
}

impl FileHeader {
    fn for_payload(payload_size: usize) -> CacheResult<Self> {
        let total_size = HEADERS_SIZE
            .checked_add(payload_size)
            .and_then(|total| u32::try_from(total).ok())
            .ok_or_else(|| {
                CacheError::InvalidBitmap(format!(
                    "{payload_size} byte payload does not fit a bitmap record"
                ))
            })?;
        Ok(Self {
            kind: BMP_SIGNATURE,
            total_size,
            reserved1: 0,
            reserved2: 0,
            pixel_offset: HEADERS_SIZE as u32,
        })
    }

    fn write(&self, buffer: &mut ByteBuffer) {
        buffer.append(&self.kind.to_le_bytes());
        buffer.append(&self.total_size.to_le_bytes());
        buffer.append(&self.reserved1.to_le_bytes());
        buffer.append(&self.reserved2.to_le_bytes());
        buffer.append(&self.pixel_offset.to_le_bytes());
    }

    fn read(buf: &[u8], offset: usize) -> CacheResult<(Self, usize)> {
        let (kind, pos) = read_u16_le(buf, offset)?;
        let (total_size, pos) = read_u32_le(buf, pos)?;
        let (reserved1, pos) = read_u16_le(buf, pos)?;
        let (reserved2, pos) = read_u16_le(buf, pos)?;
        let (pixel_offset, pos) = read_u32_le(buf, pos)?;
        Ok((
            Self {
                kind,
                total_size,
                reserved1,
                reserved2,
                pixel_offset,
            },
            pos,
        ))
    }
}

/// `BITMAPINFOHEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoHeader {
    /// Size of this header, 40
    pub size: u32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels; negative means rows are stored top-down
    pub height: i32,
    /// Color planes, 1
    pub planes: u16,
    /// Bits per pixel, 32
    pub bit_count: u16,
    /// Compression, `BI_RGB`
    pub compression: u32,
    /// Image size in bytes, may be zero for `BI_RGB`
    pub image_size: u32,
    /// Horizontal resolution
    pub x_pels_per_meter: i32,
    /// Vertical resolution
    pub y_pels_per_meter: i32,
    /// Palette entries used
    pub colors_used: u32,
    /// Palette entries required
    pub colors_important: u32,
}

impl InfoHeader {
    /// Header for an uncompressed 32 bpp bitmap.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            size: INFO_HEADER_SIZE as u32,
            width,
            height,
            planes: 1,
            bit_count: BITS_PER_PIXEL,
            compression: BI_RGB,
            ..Default::default()
        }
    }

    /// Payload size implied by the geometry, if it fits in memory.
    fn expected_payload(&self) -> Option<usize> {
        if self.width <= 0 || self.height == 0 {
            return None;
        }
        (self.width as usize)
            .checked_mul(self.height.unsigned_abs() as usize)?
            .checked_mul(BYTES_PER_PIXEL)
    }

    fn write(&self, buffer: &mut ByteBuffer) {
        buffer.append(&self.size.to_le_bytes());
        buffer.append(&self.width.to_le_bytes());
        buffer.append(&self.height.to_le_bytes());
        buffer.append(&self.planes.to_le_bytes());
        buffer.append(&self.bit_count.to_le_bytes());
        buffer.append(&self.compression.to_le_bytes());
        buffer.append(&self.image_size.to_le_bytes());
        buffer.append(&self.x_pels_per_meter.to_le_bytes());
        buffer.append(&self.y_pels_per_meter.to_le_bytes());
        buffer.append(&self.colors_used.to_le_bytes());
        buffer.append(&self.colors_important.to_le_bytes());
    }

    fn read(buf: &[u8], offset: usize) -> CacheResult<(Self, usize)> {
        let (size, pos) = read_u32_le(buf, offset)?;
        let (width, pos) = read_i32_le(buf, pos)?;
        let (height, pos) = read_i32_le(buf, pos)?;
        let (planes, pos) = read_u16_le(buf, pos)?;
        let (bit_count, pos) = read_u16_le(buf, pos)?;
        let (compression, pos) = read_u32_le(buf, pos)?;
        let (image_size, pos) = read_u32_le(buf, pos)?;
        let (x_pels_per_meter, pos) = read_i32_le(buf, pos)?;
        let (y_pels_per_meter, pos) = read_i32_le(buf, pos)?;
        let (colors_used, pos) = read_u32_le(buf, pos)?;
        let (colors_important, pos) = read_u32_le(buf, pos)?;
        Ok((
            Self {
                size,
                width,
                height,
                planes,
                bit_count,
                compression,
                image_size,
                x_pels_per_meter,
                y_pels_per_meter,
                colors_used,
                colors_important,
            },
            pos,
        ))
    }
}

/// One icon: BMP headers, the raw payload, and a display surface built from it.
///
/// Both the payload and the surface are owned; dropping the bitmap releases
/// them.
#[derive(Debug, Clone)]
pub struct IconBitmap {
    file_header: FileHeader,
    info_header: InfoHeader,
    pixels: Vec<u8>,
    surface: RgbaImage,
}

impl IconBitmap {
    /// Decode a bitmap record starting at `offset`.
    ///
    /// Returns the bitmap and the offset just past it
    /// (`offset + total_size`).
    ///
    /// # Errors
    ///
    /// [`CacheError::CorruptData`] if the declared size is smaller than the
    /// headers, runs past the end of `buf`, or disagrees with the declared
    /// geometry.
    pub fn from_bytes(buf: &[u8], offset: usize) -> CacheResult<(Self, usize)> {
        let (file_header, pos) = FileHeader::read(buf, offset)?;
        let (info_header, pos) = InfoHeader::read(buf, pos)?;

        let total_size = file_header.total_size as usize;
        let payload_size = total_size.checked_sub(HEADERS_SIZE).ok_or_else(|| {
            CacheError::corrupt(
                offset,
                format!("bitmap declares {total_size} bytes, less than its headers"),
            )
        })?;
        let (payload, end) = read_bytes(buf, pos, payload_size)?;

        if info_header.bit_count != BITS_PER_PIXEL || info_header.compression != BI_RGB {
            return Err(CacheError::corrupt(
                offset,
                format!(
                    "unsupported bitmap format: {} bpp, compression {}",
                    info_header.bit_count, info_header.compression
                ),
            ));
        }
        if info_header.expected_payload() != Some(payload_size) {
            return Err(CacheError::corrupt(
                offset,
                format!(
                    "{}x{} bitmap does not fit a {payload_size} byte payload",
                    info_header.width, info_header.height
                ),
            ));
        }

        let surface = build_surface(&info_header, payload)?;
        Ok((
            Self {
                file_header,
                info_header,
                pixels: payload.to_vec(),
                surface,
            },
            end,
        ))
    }

    /// Wrap freshly converted pixels (32 bpp premultiplied BGRA).
    ///
    /// `height` follows the BMP convention: negative for top-down rows.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidBitmap`] if `pixels` does not hold exactly
    /// `width * |height| * 4` bytes, or if the record would exceed the
    /// 32-bit size field.
    pub fn from_pixels(pixels: &[u8], width: u32, height: i32) -> CacheResult<Self> {
        let width = i32::try_from(width)
            .map_err(|_| CacheError::InvalidBitmap(format!("width {width} is too large")))?;
        let info_header = InfoHeader::new(width, height);
        if info_header.expected_payload() != Some(pixels.len()) {
            return Err(CacheError::InvalidBitmap(format!(
                "{width}x{height} bitmap needs {:?} bytes, got {}",
                info_header.expected_payload(),
                pixels.len()
            )));
        }

        let file_header = FileHeader::for_payload(pixels.len())?;
        let surface = build_surface(&info_header, pixels)?;
        Ok(Self {
            file_header,
            info_header,
            pixels: pixels.to_vec(),
            surface,
        })
    }

    /// Append file header, info header and payload, in that order.
    pub fn serialize_into(&self, buffer: &mut ByteBuffer) {
        self.file_header.write(buffer);
        self.info_header.write(buffer);
        buffer.append(&self.pixels);
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.info_header.width.unsigned_abs()
    }

    /// Height in pixels, regardless of row order.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.info_header.height.unsigned_abs()
    }

    /// Whether payload rows are stored top-down.
    #[must_use]
    pub fn is_top_down(&self) -> bool {
        self.info_header.height < 0
    }

    /// Declared total serialized size.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.file_header.total_size as usize
    }

    /// Payload size derived from the file header.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.total_size().saturating_sub(HEADERS_SIZE)
    }

    /// Raw BGRA payload in stored row order.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The file header.
    #[must_use]
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The info header.
    #[must_use]
    pub fn info_header(&self) -> &InfoHeader {
        &self.info_header
    }

    /// Display surface: top-down RGBA rows, alpha premultiplied.
    #[must_use]
    pub fn renderable(&self) -> &RgbaImage {
        &self.surface
    }

    /// A resized copy of the surface, e.g. for DPI scaling.
    ///
    /// Scaling premultiplied pixels keeps edges free of dark fringes.
    #[must_use]
    pub fn scaled(&self, size: u32) -> RgbaImage {
        if self.surface.width() == size && self.surface.height() == size {
            return self.surface.clone();
        }
        imageops::resize(&self.surface, size, size, FilterType::Triangle)
    }
}

impl PartialEq for IconBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.file_header == other.file_header
            && self.info_header == other.info_header
            && self.pixels == other.pixels
    }
}

/// Build the display surface from a BGRA payload.
fn build_surface(info: &InfoHeader, payload: &[u8]) -> CacheResult<RgbaImage> {
    let width = info.width.unsigned_abs();
    let height = info.height.unsigned_abs();
    let stride = width as usize * BYTES_PER_PIXEL;

    let mut rgba = Vec::with_capacity(payload.len());
    let mut push_row = |row: &[u8]| {
        for px in row.chunks_exact(BYTES_PER_PIXEL) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    };
    if info.height < 0 {
        payload.chunks_exact(stride).for_each(&mut push_row);
    } else {
        payload.chunks_exact(stride).rev().for_each(&mut push_row);
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| CacheError::InvalidBitmap(format!("cannot build {width}x{height} surface")))
}
