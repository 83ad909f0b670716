//! JSON output for scripting and menu backends.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "base_path": "D:\\Stacks\\Tools",
//!   "summary": {
//!     "entries": 4,
//!     "was_rebuilt": true,
//!     "cache_bytes": 5012,
//!     "failed_icons": [],
//!     "persist_error": null,
//!     "exit_code": 0,
//!     "exit_code_name": "SK000"
//!   },
//!   "menu": {
//!     "palette": { "background": 15790320, "...": 0 },
//!     "items": [
//!       { "type": "header", "id": "9f2c...", "text": "D:\\Stacks\\Tools" },
//!       { "type": "separator" },
//!       { "type": "launch", "id": "41d0...", "text": "a", "name": "a.exe" }
//!     ]
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::cache::store::FailedIcon;
use crate::cache::CacheStore;
use crate::error::ExitCode;
use crate::menu::MenuModel;

/// Run summary in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of cache entries, root included
    pub entries: usize,
    /// Whether this run rebuilt the cache
    pub was_rebuilt: bool,
    /// Size of the cache written by a rebuild, if any
    pub cache_bytes: Option<u64>,
    /// Entries that got the placeholder icon
    pub failed_icons: Vec<FailedIcon>,
    /// Why the cache file could not be written
    pub persist_error: Option<String>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "SK000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Summarize a loaded store.
    #[must_use]
    pub fn from_store(store: &CacheStore, exit_code: ExitCode) -> Self {
        let report = store.report();
        Self {
            entries: store.entries().len(),
            was_rebuilt: store.was_rebuilt(),
            cache_bytes: report.map(|r| r.bytes),
            failed_icons: report.map(|r| r.failed_icons.clone()).unwrap_or_default(),
            persist_error: report.and_then(|r| r.persist_error.clone()),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Folder the menu was built from
    pub base_path: String,
    /// Run summary
    pub summary: JsonSummary,
    /// The menu itself
    pub menu: &'a MenuModel,
}

impl<'a> JsonOutput<'a> {
    /// Build the output for a loaded store and its menu.
    #[must_use]
    pub fn new(store: &CacheStore, menu: &'a MenuModel, exit_code: ExitCode) -> Self {
        Self {
            base_path: store.base_path().to_string_lossy().into_owned(),
            summary: JsonSummary::from_store(store, exit_code),
            menu,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
