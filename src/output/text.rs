//! Plain-text rendering of a menu.
//!
//! Submenus are indented two spaces per level and marked with `>`;
//! separators are a dashed line; the header is bracketed.
//!
//! ```text
//! [D:\Stacks\Tools]
//! ----------------
//! a
//! ----------------
//! Tools >
//!   x
//! ```

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::menu::{MenuItem, MenuModel};

const SEPARATOR: &str = "----------------";

/// Render the whole menu.
#[must_use]
pub fn render(menu: &MenuModel) -> String {
    let mut out = String::new();
    render_items(&mut out, &menu.items, 0);
    out
}

/// Render the menu into a writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_to<W: Write>(menu: &MenuModel, writer: &mut W) -> io::Result<()> {
    writer.write_all(render(menu).as_bytes())
}

fn render_items(out: &mut String, items: &[MenuItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        // Writing to a String cannot fail.
        let _ = match item {
            MenuItem::Header { text, .. } => writeln!(out, "{indent}[{text}]"),
            MenuItem::Separator => writeln!(out, "{indent}{SEPARATOR}"),
            MenuItem::Launch { text, .. } => writeln!(out, "{indent}{text}"),
            MenuItem::Submenu { text, children, .. } => {
                let _ = writeln!(out, "{indent}{text} >");
                render_items(out, children, depth + 1);
                Ok(())
            }
        };
    }
}
