//! Append-only byte arena and bounds-checked readers for the cache format.
//!
//! [`ByteBuffer`] is the write side: every record is appended in order and the
//! whole buffer is persisted in one go. The free `read_*` functions are the
//! read side; each takes the loaded bytes plus an offset and returns the value
//! together with the advanced offset, failing with
//! [`CacheError::CorruptData`] instead of reading past the end.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::{CacheError, CacheResult};

/// Capacity allocated on the first append.
const BASE_CAPACITY: usize = 256;

/// Growable append-only byte sequence.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Create an empty buffer. No memory is allocated until the first append.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Append raw bytes, doubling capacity as needed.
    pub fn append(&mut self, bytes: &[u8]) {
        self.grow(self.data.len() + bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Append a little-endian `u32`.
    pub fn append_u32(&mut self, value: u32) {
        self.append(&value.to_le_bytes());
    }

    /// Append text as UTF-16LE code units, optionally followed by a null unit.
    ///
    /// The terminator is how readers recover the string length, so every
    /// string field of the cache format is written with it.
    pub fn append_str(&mut self, text: &str, with_terminator: bool) {
        let units = text.encode_utf16().count() + usize::from(with_terminator);
        self.grow(self.data.len() + units * 2);
        for unit in text.encode_utf16() {
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        if with_terminator {
            self.data.extend_from_slice(&[0, 0]);
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current allocated capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The written bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Append the whole content of a file.
    ///
    /// A missing file and an empty file are both errors: an empty cache file
    /// carries no version tag and must never be mistaken for a valid one.
    pub fn load_from_file(&mut self, path: &Path) -> CacheResult<()> {
        let bytes = fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(CacheError::EmptyFile(path.to_path_buf()));
        }
        self.append(&bytes);
        Ok(())
    }

    /// Write the whole buffer to `path`, replacing any existing content.
    pub fn save_to_file(&self, path: &Path) -> CacheResult<()> {
        fs::write(path, &self.data).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn grow(&mut self, required: usize) {
        let capacity = self.data.capacity();
        if capacity >= required {
            return;
        }
        let mut new_capacity = if capacity == 0 {
            BASE_CAPACITY
        } else {
            capacity
        };
        while new_capacity < required {
            new_capacity *= 2;
        }
        self.data.reserve_exact(new_capacity - self.data.len());
    }
}

/// Whether a load failure means "there is no usable file" rather than a real
/// I/O problem.
#[must_use]
pub fn is_missing(err: &CacheError) -> bool {
    match err {
        CacheError::EmptyFile(_) => true,
        CacheError::Io { source, .. } => source.kind() == ErrorKind::NotFound,
        _ => false,
    }
}

/// Borrow `len` bytes starting at `offset`.
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> CacheResult<(&[u8], usize)> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= buf.len())
        .ok_or_else(|| CacheError::corrupt(offset, format!("{len} bytes past end of data")))?;
    Ok((&buf[offset..end], end))
}

/// Read a single byte.
pub fn read_u8(buf: &[u8], offset: usize) -> CacheResult<(u8, usize)> {
    let (bytes, next) = read_bytes(buf, offset, 1)?;
    Ok((bytes[0], next))
}

/// Read a little-endian `u16`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> CacheResult<(u16, usize)> {
    let (bytes, next) = read_bytes(buf, offset, 2)?;
    Ok((u16::from_le_bytes([bytes[0], bytes[1]]), next))
}

/// Read a little-endian `u32`.
pub fn read_u32_le(buf: &[u8], offset: usize) -> CacheResult<(u32, usize)> {
    let (bytes, next) = read_bytes(buf, offset, 4)?;
    Ok((
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        next,
    ))
}

/// Read a little-endian `i32`.
pub fn read_i32_le(buf: &[u8], offset: usize) -> CacheResult<(i32, usize)> {
    let (value, next) = read_u32_le(buf, offset)?;
    Ok((value as i32, next))
}

/// Read a null-terminated UTF-16LE string; the returned offset is past the
/// terminator.
pub fn read_wide_str(buf: &[u8], offset: usize) -> CacheResult<(String, usize)> {
    let mut units = Vec::new();
    let mut pos = offset;
    loop {
        let (unit, next) = read_u16_le(buf, pos)
            .map_err(|_| CacheError::corrupt(offset, "unterminated string"))?;
        pos = next;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    let text = String::from_utf16(&units)
        .map_err(|_| CacheError::corrupt(offset, "string is not valid UTF-16"))?;
    Ok((text, pos))
}
