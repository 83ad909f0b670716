//! Output formatters for the built menu.
//!
//! - Text for people
//! - JSON for scripting and external menu backends
//!
//! # Example
//!
//! ```no_run
//! use stacky::cache::CacheStore;
//! use stacky::error::ExitCode;
//! use stacky::menu::{MenuModel, MenuOptions};
//! use stacky::output::{json::JsonOutput, text};
//!
//! let mut store = CacheStore::new("D:/Stacks/Tools");
//! store.scan()?;
//! store.load()?;
//! let menu = MenuModel::build(&store, &MenuOptions::default());
//!
//! print!("{}", text::render(&menu));
//! println!("{}", JsonOutput::new(&store, &menu, ExitCode::Success).to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
