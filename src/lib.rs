//! Stacky - folder-driven launcher menu
//!
//! Turns a folder into a context menu: every item becomes an entry, folders
//! ending in `.submenu` become submenus. Icons are extracted once and kept in
//! a binary cache file inside the folder, so later invocations only read that
//! file.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod icon;
pub mod logging;
pub mod menu;
pub mod output;
pub mod platform;
pub mod scanner;

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cache::CacheStore;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::icon::IconExtractor;
use crate::menu::{MenuModel, MenuOptions};
use crate::output::{text, JsonOutput};
use crate::scanner::normalize_base_path;

/// Run the application: scan, load the cache, print the menu.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the folder cannot be
/// scanned, or output cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = cli.apply_to(Config::load(cli.config.as_deref())?);
    log::debug!("Effective configuration: {config:?}");

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::Success);
    }

    let raw_path = cli
        .path
        .as_deref()
        .context("No folder given")?;
    let base_path = normalize_base_path(raw_path);

    let mut store = CacheStore::new(&base_path).with_policy(config.staleness);
    let extractor = IconExtractor::new(config.icon_size, &store.conventions().override_file_name);
    store = store.with_extractor(extractor);

    store
        .scan()
        .with_context(|| format!("Failed to scan {}", base_path.display()))?;
    if cli.rebuild {
        store.rebuild().context("Failed to rebuild the cache")?;
    } else {
        store.load().context("Failed to load the cache")?;
    }

    let exit_code = match store.report() {
        Some(report) if !report.is_clean() => ExitCode::PartialSuccess,
        _ => ExitCode::Success,
    };
    log::info!(
        "{} entries from {}{}",
        store.entries().len(),
        base_path.display(),
        if store.was_rebuilt() { " (rebuilt)" } else { "" }
    );

    let menu = MenuModel::build(
        &store,
        &MenuOptions {
            header: config.header,
            dark_mode: config.dark_mode,
        },
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => text::write_to(&menu, &mut out).context("Failed to write menu")?,
        OutputFormat::Json => JsonOutput::new(&store, &menu, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
    }
    out.flush().context("Failed to flush output")?;

    Ok(exit_code)
}
