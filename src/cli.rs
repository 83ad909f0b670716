//! Command-line interface definitions.
//!
//! ```bash
//! # Build the menu for a folder and print it
//! stacky "D:\Stacks\Tools\"
//!
//! # Folder name only in the header, dark palette, JSON for a menu backend
//! stacky D:\Stacks\Tools --compact-header --dark-mode --format json
//!
//! # Force a rebuild and show what happened
//! stacky -v D:\Stacks\Tools --rebuild
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Config;
use crate::menu::HeaderStyle;

/// Folder-driven launcher menu with a persistent icon cache.
///
/// Every item in PATH becomes a menu entry. Folders ending in `.submenu` become
/// submenus, items ending in `.ignore` are skipped, and `.separator` files
/// draw a divider.
#[derive(Debug, Parser)]
#[command(name = "stacky")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder to build the menu from (quotes and trailing separators are
    /// accepted)
    #[arg(value_name = "PATH", required_unless_present = "print_config")]
    pub path: Option<String>,

    /// Hide the top folder item and the separator below it
    #[arg(long, conflicts_with = "compact_header")]
    pub hide_header: bool,

    /// Show only the folder name in the header
    #[arg(long)]
    pub compact_header: bool,

    /// Use the dark menu palette
    #[arg(long)]
    pub dark_mode: bool,

    /// Rebuild the cache even if it is current
    #[arg(long)]
    pub rebuild: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (defaults to config.toml in the platform config
    /// directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for the built menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Indented plain text
    #[default]
    Text,
    /// JSON document
    Json,
}

impl Cli {
    /// Apply the flags on top of a loaded configuration.
    #[must_use]
    pub fn apply_to(&self, mut config: Config) -> Config {
        if self.hide_header {
            config.header = HeaderStyle::Hidden;
        } else if self.compact_header {
            config.header = HeaderStyle::Compact;
        }
        if self.dark_mode {
            config.dark_mode = true;
        }
        config
    }
}
