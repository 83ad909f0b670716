//! Menu model built from the cache entries.
//!
//! The model is what a menu backend draws: a tree of headers, separators,
//! launchable items and submenus, each pointing back at its cache entry by
//! [`EntryId`]. Icons stay in the [`CacheStore`] and are looked up by id.
//!
//! ```no_run
//! use stacky::cache::CacheStore;
//! use stacky::menu::{MenuModel, MenuOptions};
//!
//! let mut store = CacheStore::new("D:/Stacks/Tools");
//! store.scan()?;
//! store.load()?;
//! let model = MenuModel::build(&store, &MenuOptions::default());
//! println!("{} top-level items", model.items.len());
//! # Ok::<(), stacky::cache::CacheError>(())
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStore, EntryId};
use crate::scanner::{Conventions, NAME_SEPARATOR};

/// Launchable extensions hidden from item labels, stripped in this order.
const HIDDEN_EXTENSIONS: &[&str] = &[".bat", ".cmd", ".exe", ".lnk", ".url", ".vbs"];

/// How the base folder is shown at the top of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStyle {
    /// Full folder path
    #[default]
    Full,
    /// Last folder name only
    Compact,
    /// No header and no separator below it
    Hidden,
}

/// Menu colors as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    /// Item background
    pub background: u32,
    /// Item text
    pub text: u32,
    /// Disabled item text
    pub disabled_text: u32,
    /// Selected item background
    pub selection: u32,
    /// Selected item text
    pub selection_text: u32,
    /// Separator line
    pub separator: u32,
}

impl Palette {
    /// Colors for light or dark menus.
    #[must_use]
    pub fn new(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                background: 0x20_20_20,
                text: 0xF0_F0_F0,
                disabled_text: 0x8C_8C_8C,
                selection: 0x40_40_40,
                selection_text: 0xFF_FF_FF,
                separator: 0x46_46_46,
            }
        } else {
            Self {
                background: 0xF0_F0_F0,
                text: 0x00_00_00,
                disabled_text: 0x6D_6D_6D,
                selection: 0x00_78_D7,
                selection_text: 0xFF_FF_FF,
                separator: 0xA0_A0_A0,
            }
        }
    }
}

/// Options controlling the menu layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuOptions {
    /// Header style
    pub header: HeaderStyle,
    /// Dark palette instead of the light one
    pub dark_mode: bool,
}

/// One menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuItem {
    /// The base folder; opening it opens the folder itself.
    Header {
        /// Entry id of the root entry
        id: EntryId,
        /// Label
        text: String,
    },
    /// A divider line.
    Separator,
    /// Something to launch.
    Launch {
        /// Entry id
        id: EntryId,
        /// Label
        text: String,
        /// Relative entry name
        name: String,
    },
    /// A submenu folder with its children.
    Submenu {
        /// Entry id
        id: EntryId,
        /// Label
        text: String,
        /// Absolute folder path
        path: PathBuf,
        /// Direct children
        children: Vec<MenuItem>,
    },
}

impl MenuItem {
    /// Label shown for the item; empty for separators.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Header { text, .. } | Self::Launch { text, .. } | Self::Submenu { text, .. } => {
                text
            }
            Self::Separator => "",
        }
    }

    /// Entry id, absent for separators.
    #[must_use]
    pub fn id(&self) -> Option<EntryId> {
        match self {
            Self::Header { id, .. } | Self::Launch { id, .. } | Self::Submenu { id, .. } => {
                Some(*id)
            }
            Self::Separator => None,
        }
    }
}

/// The complete menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuModel {
    /// Colors to draw with
    pub palette: Palette,
    /// Top-level items
    pub items: Vec<MenuItem>,
}

impl MenuModel {
    /// Lay out the store's entries.
    #[must_use]
    pub fn build(store: &CacheStore, options: &MenuOptions) -> Self {
        let mut items = Vec::new();
        let entries = store.entries();

        if let Some(root) = entries.first() {
            if let Some(text) = header_label(root.name(), options.header) {
                items.push(MenuItem::Header {
                    id: root.id(),
                    text,
                });
                items.push(MenuItem::Separator);
            }
        }

        let rest = entries.get(1..).unwrap_or_default();
        items.extend(children(rest, "", store));

        Self {
            palette: Palette::new(options.dark_mode),
            items,
        }
    }

    /// Absolute path for an item id.
    #[must_use]
    pub fn resolve(store: &CacheStore, id: EntryId) -> Option<PathBuf> {
        store
            .entry_by_id(id)
            .map(|entry| store.resolve_path(entry.name()))
    }

    /// Number of items at any depth, separators included.
    #[must_use]
    pub fn item_count(&self) -> usize {
        fn count(items: &[MenuItem]) -> usize {
            items
                .iter()
                .map(|item| match item {
                    MenuItem::Submenu { children, .. } => 1 + count(children),
                    _ => 1,
                })
                .sum()
        }
        count(&self.items)
    }
}

/// Items directly under `prefix` (empty for the root, else `"X.submenu\"`).
fn children(entries: &[CacheEntry], prefix: &str, store: &CacheStore) -> Vec<MenuItem> {
    let conventions = store.conventions();
    entries
        .iter()
        .filter_map(|entry| {
            let rel = entry.name().strip_prefix(prefix)?;
            if rel.is_empty() || rel.contains(NAME_SEPARATOR) {
                return None;
            }
            Some(item_for(entry, rel, entries, conventions, store))
        })
        .collect()
}

fn item_for(
    entry: &CacheEntry,
    label: &str,
    entries: &[CacheEntry],
    conventions: &Conventions,
    store: &CacheStore,
) -> MenuItem {
    if conventions.is_separator_name(label) {
        return MenuItem::Separator;
    }

    if entry.is_submenu() {
        let prefix = format!("{}{}", entry.name(), NAME_SEPARATOR);
        return MenuItem::Submenu {
            id: entry.id(),
            text: label
                .strip_suffix(conventions.submenu_suffix.as_str())
                .unwrap_or(label)
                .to_string(),
            path: entry
                .submenu_path()
                .map_or_else(|| store.resolve_path(entry.name()), PathBuf::from),
            children: children(entries, &prefix, store),
        };
    }

    MenuItem::Launch {
        id: entry.id(),
        text: display_text(label),
        name: entry.name().to_string(),
    }
}

/// Label for a launchable item: known launcher extensions are dropped.
#[must_use]
pub fn display_text(name: &str) -> String {
    HIDDEN_EXTENSIONS
        .iter()
        .fold(name, |text, ext| text.strip_suffix(ext).unwrap_or(text))
        .to_string()
}

/// Header label for the root entry, `None` when hidden.
#[must_use]
pub fn header_label(root_name: &str, style: HeaderStyle) -> Option<String> {
    match style {
        HeaderStyle::Hidden => None,
        HeaderStyle::Full => Some(root_name.to_string()),
        HeaderStyle::Compact => {
            let trimmed = root_name.trim_end_matches(['\\', '/']);
            let leaf = trimmed.rsplit(['\\', '/']).next().unwrap_or(trimmed);
            Some(if leaf.is_empty() { root_name } else { leaf }.to_string())
        }
    }
}
