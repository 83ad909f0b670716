//! Structured error handling and exit codes.

use serde::Serialize;

use crate::cache::CacheError;
use crate::scanner::ScanError;

/// Exit codes for the stacky binary.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Invalid path (missing, not a folder, or unreadable)
/// - 3: Partial success (menu built, but icons fell back or the cache was
///   not saved)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the menu was built from a clean cache.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Invalid path: the base folder cannot be scanned.
    InvalidPath = 2,
    /// Partial success: the menu was built with warnings.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SK000",
            Self::GeneralError => "SK001",
            Self::InvalidPath => "SK002",
            Self::PartialSuccess => "SK003",
        }
    }

    /// Exit code for an error returned by the application.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let scan_error = err.chain().find_map(|cause| {
            cause.downcast_ref::<ScanError>().or_else(|| {
                match cause.downcast_ref::<CacheError>() {
                    Some(CacheError::Scan(e)) => Some(e),
                    _ => None,
                }
            })
        });
        if scan_error.is_some() {
            Self::InvalidPath
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "SK002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
