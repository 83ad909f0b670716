//! Per-folder icon overrides read from `desktop.ini`.
//!
//! A folder may carry a `desktop.ini` with a `[.ShellClassInfo]` section:
//!
//! ```ini
//! [.ShellClassInfo]
//! IconResource=%SystemRoot%\System32\shell32.dll,4
//! IconFile=folder.ico
//! ```
//!
//! `IconResource` wins over `IconFile` when both are present. A `,N` suffix
//! selects an icon index, `%VAR%` tokens are expanded from the environment,
//! and relative paths are taken relative to the folder itself.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};

use super::ExtractError;

/// Section holding the icon keys.
const SECTION: &str = ".ShellClassInfo";
const KEY_ICON_RESOURCE: &str = "IconResource";
const KEY_ICON_FILE: &str = "IconFile";

/// Where an override icon lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconLocation {
    /// Absolute path of the icon file or module
    pub path: PathBuf,
    /// Icon index inside the file, 0 when not given
    pub index: i32,
}

/// Read the override declared for `folder`, if any.
///
/// Returns `Ok(None)` when there is no override file or it names no icon.
///
/// # Errors
///
/// [`ExtractError::Io`] if the file exists but cannot be read, and
/// [`ExtractError::InvalidOverride`] if it is not parseable INI.
pub fn read_override(folder: &Path, file_name: &str) -> Result<Option<IconLocation>, ExtractError> {
    let path = folder.join(file_name);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ExtractError::Io { path, source }),
    };

    let text = decode_text(&bytes);
    let location = parse_override(&text, folder).map_err(|reason| ExtractError::InvalidOverride {
        path: path.clone(),
        reason,
    })?;
    if let Some(location) = &location {
        log::debug!(
            "Icon override for {}: {},{}",
            folder.display(),
            location.path.display(),
            location.index
        );
    }
    Ok(location)
}

/// Parse override file content.
///
/// Backslashes are path separators here, so INI escapes are turned off.
pub fn parse_override(text: &str, folder: &Path) -> Result<Option<IconLocation>, String> {
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, options).map_err(|e| e.to_string())?;

    let Some(properties) = ini
        .iter()
        .find(|(section, _)| section.is_some_and(|s| s.eq_ignore_ascii_case(SECTION)))
        .map(|(_, properties)| properties)
    else {
        return Ok(None);
    };

    let lookup = |key: &str| {
        properties
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
    };

    Ok(lookup(KEY_ICON_RESOURCE)
        .or_else(|| lookup(KEY_ICON_FILE))
        .map(|value| parse_location(&value, folder)))
}

/// Turn an `IconResource`/`IconFile` value into a location.
#[must_use]
pub fn parse_location(value: &str, folder: &Path) -> IconLocation {
    let (raw_path, index) = match value.split_once(',') {
        Some((path, index)) => (path, parse_index(index)),
        None => (value, 0),
    };

    let expanded = expand_env_vars(raw_path.trim().trim_matches('"'));
    let path = if looks_absolute(&expanded) {
        PathBuf::from(expanded)
    } else {
        folder.join(expanded)
    };
    IconLocation { path, index }
}

/// Parse an icon index the way `atoi` would: optional sign, leading digits,
/// anything unparseable is 0.
fn parse_index(text: &str) -> i32 {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i32>().map_or(0, |n| sign * n)
}

/// Expand `%VAR%` tokens from the environment.
///
/// Unknown variables and a lone `%` are kept as written.
#[must_use]
pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) if !name.is_empty() => out.push_str(&value),
                    _ => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Absolute in either Windows or POSIX notation.
fn looks_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with(['\\', '/'])
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
        || Path::new(path).is_absolute()
}

/// Decode override file bytes; Explorer writes them as UTF-16LE with a BOM.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(body).into_owned()
}
