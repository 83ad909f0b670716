use image::{Rgba, RgbaImage};
use stacky::cache::{CacheEntry, CacheStore};
use stacky::icon::{
    EntryKind, ExtractError, IconExtractor, IconLocation, IconSource, ImageIconSource,
    DEFAULT_ICON_SIZE,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn write_png(path: &Path, color: Rgba<u8>) {
    RgbaImage::from_pixel(DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE, color)
        .save(path)
        .unwrap();
}

fn write_override(folder: &Path, value: &str) {
    fs::write(
        folder.join("desktop.ini"),
        format!("[.ShellClassInfo]\r\nIconResource={value}\r\n"),
    )
    .unwrap();
}

fn load(dir: &Path) -> CacheStore {
    let mut store = CacheStore::new(dir);
    store.scan().unwrap();
    store.load().unwrap();
    store
}

fn entry<'a>(store: &'a CacheStore, name: &str) -> &'a CacheEntry {
    store.entries().iter().find(|e| e.name() == name).unwrap()
}

fn is_solid_red(pixels: &[u8]) -> bool {
    pixels.chunks_exact(4).all(|p| p == [0, 0, 255, 255])
}

#[test]
fn test_folder_override_points_at_image() {
    let dir = TempDir::new().unwrap();
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    write_png(&tools.join("folder.png"), RED);
    write_override(&tools, "folder.png,0");

    let store = load(dir.path());
    let tools_entry = entry(&store, "Tools.submenu");
    assert!(is_solid_red(tools_entry.icon().pixels()));
    assert!(store.report().unwrap().is_clean());
}

#[test]
fn test_override_with_absolute_path_and_icon_file_key() {
    let dir = TempDir::new().unwrap();
    let icons = TempDir::new().unwrap();
    let icon = icons.path().join("plain.png");
    write_png(&icon, RED);

    let docs = dir.path().join("Docs");
    fs::create_dir(&docs).unwrap();
    fs::write(
        docs.join("desktop.ini"),
        format!("[.ShellClassInfo]\nIconFile={}\n", icon.display()),
    )
    .unwrap();

    let store = load(dir.path());
    assert!(is_solid_red(entry(&store, "Docs").icon().pixels()));
}

#[test]
fn test_root_folder_override() {
    let dir = TempDir::new().unwrap();
    write_png(&dir.path().join("root.png"), RED);
    write_override(dir.path(), "root.png");

    let store = load(dir.path());
    assert!(is_solid_red(store.entries()[0].icon().pixels()));
    // The override file itself is never an entry
    assert!(store.entries().iter().all(|e| e.name() != "desktop.ini"));
}

fn plain_submenu_icon() -> Vec<u8> {
    let plain = TempDir::new().unwrap();
    fs::create_dir(plain.path().join("Plain.submenu")).unwrap();
    let reference = load(plain.path());
    entry(&reference, "Plain.submenu").icon().pixels().to_vec()
}

#[test]
fn test_broken_override_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let with_missing = dir.path().join("Missing.submenu");
    fs::create_dir(&with_missing).unwrap();
    write_override(&with_missing, "nothere.png");

    let store = load(dir.path());
    assert_eq!(
        entry(&store, "Missing.submenu").icon().pixels(),
        plain_submenu_icon().as_slice()
    );
    assert!(store.report().unwrap().is_clean());
}

#[cfg(not(windows))]
#[test]
fn test_module_override_falls_back_without_shell() {
    let dir = TempDir::new().unwrap();
    let with_module = dir.path().join("Module.submenu");
    fs::create_dir(&with_module).unwrap();
    write_override(&with_module, "%SystemRoot%\\System32\\shell32.dll,4");

    let store = load(dir.path());
    assert_eq!(
        entry(&store, "Module.submenu").icon().pixels(),
        plain_submenu_icon().as_slice()
    );
    assert!(store.report().unwrap().is_clean());
}

#[cfg(windows)]
#[test]
fn test_module_override_reads_icon_resource() {
    let dir = TempDir::new().unwrap();
    let with_module = dir.path().join("Module.submenu");
    fs::create_dir(&with_module).unwrap();
    write_override(&with_module, "%SystemRoot%\\System32\\shell32.dll,4");

    let store = load(dir.path());
    let icon = entry(&store, "Module.submenu").icon();
    assert_eq!(icon.width(), DEFAULT_ICON_SIZE);
    assert_ne!(icon.pixels(), plain_submenu_icon().as_slice());
    assert!(store.report().unwrap().is_clean());
}

#[cfg(windows)]
#[test]
fn test_shell_icons_for_launcher_items() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    fs::create_dir(dir.path().join("Docs")).unwrap();

    let store = load(dir.path());
    assert!(store.report().unwrap().is_clean());
    for e in store.entries() {
        assert!(e.icon().pixels().chunks_exact(4).any(|px| px[3] != 0));
    }
}

#[test]
fn test_files_ignore_overrides() {
    let dir = TempDir::new().unwrap();
    let extractor = IconExtractor::new(DEFAULT_ICON_SIZE, "desktop.ini");
    let file = dir.path().join("a.exe");
    fs::write(&file, b"MZ").unwrap();
    write_png(&dir.path().join("red.png"), RED);
    write_override(dir.path(), "red.png");

    let pixels = extractor.extract(&file, EntryKind::File).unwrap();
    assert!(!is_solid_red(&pixels.bgra));
}

#[cfg(not(windows))]
#[test]
fn test_image_files_are_their_own_icon() {
    let dir = TempDir::new().unwrap();
    write_png(&dir.path().join("logo.png"), RED);

    let store = load(dir.path());
    assert!(is_solid_red(entry(&store, "logo.png").icon().pixels()));
}

/// Source that cannot produce any icon.
struct BrokenSource;

impl IconSource for BrokenSource {
    fn load_location(&self, location: &IconLocation, _size: u32) -> Result<RgbaImage, ExtractError> {
        Err(ExtractError::Unsupported(location.path.clone()))
    }

    fn default_icon(&self, path: &Path, _kind: EntryKind, _size: u32) -> Result<RgbaImage, ExtractError> {
        Err(ExtractError::Unsupported(path.to_path_buf()))
    }
}

#[test]
fn test_failed_extraction_uses_placeholder() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.exe"), b"MZ").unwrap();
    fs::write(dir.path().join("b.exe"), b"MZ").unwrap();

    let extractor = IconExtractor::with_source(Box::new(BrokenSource), DEFAULT_ICON_SIZE, "desktop.ini");
    let placeholder = extractor.placeholder();
    let mut store = CacheStore::new(dir.path()).with_extractor(extractor);
    store.scan().unwrap();
    store.load().unwrap();

    let report = store.report().unwrap();
    assert!(!report.is_clean());
    // Root plus both files
    assert_eq!(report.failed_icons.len(), 3);
    assert!(report.persist_error.is_none());
    for e in store.entries() {
        assert_eq!(e.icon().pixels(), placeholder.bgra.as_slice());
    }

    // The placeholders were persisted; a normal load reuses them
    let reloaded = load(dir.path());
    assert!(!reloaded.was_rebuilt());
    assert_eq!(reloaded.entries()[1].icon().pixels(), placeholder.bgra.as_slice());
}

#[test]
fn test_default_source_handles_every_kind() {
    let dir = TempDir::new().unwrap();
    let source = ImageIconSource::new();
    for kind in [
        EntryKind::File,
        EntryKind::Directory { submenu: false },
        EntryKind::Directory { submenu: true },
    ] {
        let image = source
            .default_icon(&dir.path().join("x.exe"), kind, DEFAULT_ICON_SIZE)
            .unwrap();
        assert_eq!(image.dimensions(), (DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE));
    }
}
