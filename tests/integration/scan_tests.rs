use stacky::cache::{CacheError, CacheStore, CACHE_FILE_NAME};
use stacky::scanner::{normalize_base_path, Conventions, ScanError, Walker};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::write(path, b"x").unwrap();
}

fn scan_names(dir: &Path) -> Vec<String> {
    Walker::new(dir, Conventions::default()).scan().unwrap().names
}

fn as_set(names: &[String]) -> HashSet<&str> {
    names.iter().map(String::as_str).collect()
}

#[test]
fn test_flat_folder() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    touch(&dir.path().join("b.lnk"));

    let names = scan_names(dir.path());
    assert_eq!(as_set(&names), HashSet::from(["a.exe", "b.lnk"]));
}

#[test]
fn test_separator_files_are_listed() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    touch(&dir.path().join(".separator"));
    touch(&dir.path().join("b.lnk"));

    let names = scan_names(dir.path());
    assert_eq!(names.len(), 3);
    assert!(names.iter().any(|n| n == ".separator"));
}

#[test]
fn test_submenu_children_follow_their_folder() {
    let dir = TempDir::new().unwrap();
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    touch(&tools.join("y.exe"));

    let names = scan_names(dir.path());
    assert_eq!(names[0], "Tools.submenu");
    assert_eq!(
        as_set(&names[1..]),
        HashSet::from(["Tools.submenu\\x.bat", "Tools.submenu\\y.exe"])
    );
}

#[test]
fn test_nested_submenus() {
    let dir = TempDir::new().unwrap();
    let inner = dir.path().join("A.submenu").join("B.submenu");
    fs::create_dir_all(&inner).unwrap();
    touch(&inner.join("deep.exe"));

    let names = scan_names(dir.path());
    assert_eq!(
        names,
        vec![
            "A.submenu".to_string(),
            "A.submenu\\B.submenu".to_string(),
            "A.submenu\\B.submenu\\deep.exe".to_string(),
        ]
    );
}

#[test]
fn test_plain_folders_are_not_descended() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("Docs");
    fs::create_dir(&docs).unwrap();
    touch(&docs.join("inside.txt"));

    assert_eq!(scan_names(dir.path()), vec!["Docs".to_string()]);
}

#[test]
fn test_excluded_names() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("keep.exe"));
    touch(&dir.path().join("skip.exe.ignore"));
    touch(&dir.path().join("desktop.ini"));
    touch(&dir.path().join(CACHE_FILE_NAME));
    let hidden_menu = dir.path().join("Old.submenu.ignore");
    fs::create_dir(&hidden_menu).unwrap();
    touch(&hidden_menu.join("old.exe"));

    assert_eq!(scan_names(dir.path()), vec!["keep.exe".to_string()]);
}

#[test]
fn test_override_file_inside_submenu_is_excluded() {
    let dir = TempDir::new().unwrap();
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("Desktop.ini"));

    assert_eq!(scan_names(dir.path()), vec!["Tools.submenu".to_string()]);
}

#[test]
fn test_scan_is_deterministic() {
    let dir = TempDir::new().unwrap();
    for name in ["c.exe", "a.lnk", "b.url", "d.bat"] {
        touch(&dir.path().join(name));
    }
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));

    let first = Walker::new(dir.path(), Conventions::default()).scan().unwrap();
    let second = Walker::new(dir.path(), Conventions::default()).scan().unwrap();
    assert_eq!(first, second);
    assert!(first.max_modified.is_some());
}

#[test]
fn test_empty_folder() {
    let dir = TempDir::new().unwrap();
    let scan = Walker::new(dir.path(), Conventions::default()).scan().unwrap();
    assert!(scan.is_empty());
    assert!(scan.max_modified.is_none());
}

#[test]
fn test_missing_folder_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone");

    let err = Walker::new(&missing, Conventions::default())
        .scan()
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));

    let mut store = CacheStore::new(&missing);
    let err = store.scan().unwrap_err();
    assert!(matches!(err, CacheError::Scan(ScanError::NotFound(_))));
    assert!(store.scanned().is_none());
}

#[test]
fn test_file_as_base_is_an_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.exe");
    touch(&file);

    let err = Walker::new(&file, Conventions::default()).scan().unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory(_)));
}

#[test]
fn test_load_before_scan_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut store = CacheStore::new(dir.path());
    assert!(matches!(store.load(), Err(CacheError::NotScanned)));
    assert!(matches!(store.rebuild(), Err(CacheError::NotScanned)));
}

#[test]
fn test_quoted_path_with_trailing_separator() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    let raw = format!("\"{}/\"", dir.path().display());

    let base = normalize_base_path(&raw);
    assert_eq!(base, dir.path());
    assert_eq!(scan_names(&base), vec!["a.exe".to_string()]);
}

#[test]
fn test_custom_conventions() {
    let dir = TempDir::new().unwrap();
    let group = dir.path().join("Group.menu");
    fs::create_dir(&group).unwrap();
    touch(&group.join("x.exe"));
    touch(&dir.path().join("y.exe.skip"));

    let conventions = Conventions {
        submenu_suffix: ".menu".to_string(),
        ignore_suffix: ".skip".to_string(),
        ..Conventions::default()
    };
    let names = Walker::new(dir.path(), conventions).scan().unwrap().names;
    assert_eq!(
        names,
        vec!["Group.menu".to_string(), "Group.menu\\x.exe".to_string()]
    );
}
