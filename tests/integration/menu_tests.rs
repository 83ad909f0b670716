use stacky::cache::{CacheStore, EntryId};
use stacky::error::ExitCode;
use stacky::menu::{display_text, HeaderStyle, MenuItem, MenuModel, MenuOptions, Palette};
use stacky::output::{text, JsonOutput};
use stacky::scanner::root_entry_name;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::write(path, b"x").unwrap();
}

fn store_for(dir: &Path) -> CacheStore {
    let mut store = CacheStore::new(dir);
    store.scan().unwrap();
    store.load().unwrap();
    store
}

fn launch_texts(items: &[MenuItem]) -> Vec<&str> {
    items
        .iter()
        .filter(|item| matches!(item, MenuItem::Launch { .. }))
        .map(MenuItem::text)
        .collect()
}

#[test]
fn test_flat_folder_menu() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("Notepad.exe"));
    touch(&dir.path().join("Docs.url"));
    let store = store_for(dir.path());

    let menu = MenuModel::build(&store, &MenuOptions::default());
    assert!(matches!(&menu.items[0], MenuItem::Header { text, .. } if *text == root_entry_name(dir.path())));
    assert_eq!(menu.items[1], MenuItem::Separator);

    let mut texts = launch_texts(&menu.items);
    texts.sort_unstable();
    assert_eq!(texts, vec!["Docs", "Notepad"]);
    assert_eq!(menu.item_count(), 4);
}

#[test]
fn test_separator_entry_becomes_divider() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    touch(&dir.path().join("-----.separator.lnk"));
    let store = store_for(dir.path());

    let menu = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Hidden,
            dark_mode: false,
        },
    );
    assert_eq!(menu.items.len(), 2);
    assert_eq!(
        menu.items
            .iter()
            .filter(|item| **item == MenuItem::Separator)
            .count(),
        1
    );
}

#[test]
fn test_submenu_holds_its_children() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("top.exe"));
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    touch(&tools.join("y.cmd"));
    let store = store_for(dir.path());

    let menu = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Hidden,
            dark_mode: false,
        },
    );
    assert_eq!(menu.items.len(), 2);

    let submenu = menu
        .items
        .iter()
        .find(|item| matches!(item, MenuItem::Submenu { .. }))
        .unwrap();
    let MenuItem::Submenu {
        text,
        path,
        children,
        ..
    } = submenu
    else {
        unreachable!();
    };
    assert_eq!(text, "Tools");
    assert_eq!(path, &tools);
    let mut texts = launch_texts(children);
    texts.sort_unstable();
    assert_eq!(texts, vec!["x", "y"]);
    assert_eq!(menu.item_count(), 4);
}

#[test]
fn test_header_styles() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    let store = store_for(dir.path());
    let leaf = dir.path().file_name().unwrap().to_string_lossy().to_string();

    let compact = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Compact,
            dark_mode: false,
        },
    );
    assert_eq!(compact.items[0].text(), leaf);

    let hidden = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Hidden,
            dark_mode: false,
        },
    );
    assert_eq!(hidden.items.len(), 1);
    assert!(!matches!(hidden.items[0], MenuItem::Header { .. }));
}

#[test]
fn test_dark_palette() {
    let dir = TempDir::new().unwrap();
    let store = store_for(dir.path());

    let dark = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Full,
            dark_mode: true,
        },
    );
    assert_eq!(dark.palette, Palette::new(true));
    assert_ne!(dark.palette, Palette::new(false));
}

#[test]
fn test_resolve_by_id() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    let store = store_for(dir.path());

    let root_id = store.entries()[0].id();
    assert_eq!(MenuModel::resolve(&store, root_id), Some(dir.path().to_path_buf()));
    assert_eq!(
        MenuModel::resolve(&store, EntryId::from_name("Tools.submenu\\x.bat")),
        Some(tools.join("x.bat"))
    );
    assert_eq!(MenuModel::resolve(&store, EntryId::from_name("nope.exe")), None);
}

#[test]
fn test_menu_is_identical_after_reload() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    touch(&dir.path().join(".separator"));
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));

    let first = store_for(dir.path());
    let second = store_for(dir.path());
    assert!(!second.was_rebuilt());

    let options = MenuOptions::default();
    assert_eq!(
        MenuModel::build(&first, &options),
        MenuModel::build(&second, &options)
    );
}

#[test]
fn test_display_text_in_submenus_uses_full_list() {
    assert_eq!(display_text("tool.vbs"), "tool");
    assert_eq!(display_text("Readme.txt"), "Readme.txt");
    assert_eq!(display_text("Setup.EXE"), "Setup.EXE");
}

#[test]
fn test_text_rendering() {
    let dir = TempDir::new().unwrap();
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    let store = store_for(dir.path());

    let menu = MenuModel::build(
        &store,
        &MenuOptions {
            header: HeaderStyle::Compact,
            dark_mode: false,
        },
    );
    let rendered = text::render(&menu);
    let lines: Vec<&str> = rendered.lines().collect();
    assert!(lines[0].starts_with('['));
    assert!(lines.contains(&"Tools >"));
    assert!(lines.contains(&"  x"));
}

#[test]
fn test_json_output() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    let store = store_for(dir.path());
    let menu = MenuModel::build(&store, &MenuOptions::default());

    let json = JsonOutput::new(&store, &menu, ExitCode::Success)
        .to_json()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let items = value["menu"]["items"].as_array().unwrap();
    assert_eq!(items[0]["type"], "header");
    assert_eq!(items[1]["type"], "separator");
    assert_eq!(items[2]["type"], "launch");
    assert_eq!(items[2]["text"], "a");
    assert_eq!(
        items[2]["id"],
        EntryId::from_name("a.exe").to_string()
    );
}
