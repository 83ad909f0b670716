use filetime::FileTime;
use stacky::cache::{
    ByteBuffer, CacheEntry, CacheStore, StalenessPolicy, CACHE_FILE_NAME, CACHE_VERSION,
};
use stacky::scanner::root_entry_name;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::write(path, b"x").unwrap();
}

fn stack_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.exe"));
    touch(&dir.path().join("b.lnk"));
    touch(&dir.path().join(".separator"));
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    dir
}

fn loaded(dir: &Path, policy: StalenessPolicy) -> CacheStore {
    let mut store = CacheStore::new(dir).with_policy(policy);
    store.scan().unwrap();
    store.load().unwrap();
    store
}

fn set_mtime(path: &Path, time: SystemTime) {
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

/// Decode every entry of a cache file.
fn read_entries(path: &Path) -> Vec<CacheEntry> {
    let bytes = fs::read(path).unwrap();
    let mut pos = 4;
    let mut entries = Vec::new();
    while pos < bytes.len() {
        let (entry, next) = CacheEntry::deserialize(&bytes, pos).unwrap();
        entries.push(entry);
        pos = next;
    }
    entries
}

fn write_entries(path: &Path, entries: &[CacheEntry]) {
    let mut buffer = ByteBuffer::new();
    buffer.append_u32(CACHE_VERSION);
    for entry in entries {
        entry.serialize(&mut buffer);
    }
    let _ = fs::remove_file(path);
    buffer.save_to_file(path).unwrap();
}

#[test]
fn test_empty_directory_has_only_root_entry() {
    let dir = TempDir::new().unwrap();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    assert_eq!(store.scanned().unwrap().len(), 0);
    assert_eq!(store.entries().len(), 1);
    assert_eq!(store.entries()[0].name(), root_entry_name(dir.path()));
    assert!(store.was_rebuilt());
}

#[test]
fn test_rebuild_aligns_entries_with_scan() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);
    let scanned = store.scanned().unwrap();

    assert_eq!(store.entries().len(), scanned.len() + 1);
    for (name, entry) in scanned.names.iter().zip(&store.entries()[1..]) {
        assert_eq!(name, entry.name());
    }

    let tools = store
        .entries()
        .iter()
        .find(|e| e.name() == "Tools.submenu")
        .unwrap();
    assert!(tools.is_submenu());
    assert_eq!(
        tools.submenu_path(),
        Some(dir.path().join("Tools.submenu").as_path())
    );
}

#[test]
fn test_cache_file_starts_with_version_tag() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    let bytes = fs::read(store.cache_path()).unwrap();
    assert_eq!(&bytes[..4], &CACHE_VERSION.to_le_bytes());
    assert_eq!(store.cache_path(), dir.path().join(CACHE_FILE_NAME));
    assert_eq!(bytes.len() as u64, store.report().unwrap().bytes);
}

#[test]
fn test_unchanged_tree_loads_without_rebuild() {
    let dir = stack_dir();
    let first = loaded(dir.path(), StalenessPolicy::Ordered);
    let second = loaded(dir.path(), StalenessPolicy::Ordered);

    assert!(!second.was_rebuilt());
    assert_eq!(second.entries().len(), first.entries().len());
    for (a, b) in first.entries().iter().zip(second.entries()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.icon().pixels(), b.icon().pixels());
        assert_eq!(a.icon().renderable(), b.icon().renderable());
    }
}

#[test]
fn test_repeated_loads_are_stable() {
    let dir = stack_dir();
    let _ = loaded(dir.path(), StalenessPolicy::Ordered);
    for _ in 0..3 {
        assert!(!loaded(dir.path(), StalenessPolicy::Ordered).was_rebuilt());
    }
}

#[test]
fn test_version_mismatch_forces_rebuild() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    let mut bytes = fs::read(store.cache_path()).unwrap();
    bytes[..4].copy_from_slice(&(CACHE_VERSION - 1).to_le_bytes());
    fs::remove_file(store.cache_path()).unwrap();
    fs::write(store.cache_path(), &bytes).unwrap();

    let reloaded = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(reloaded.was_rebuilt());
    let bytes = fs::read(reloaded.cache_path()).unwrap();
    assert_eq!(&bytes[..4], &CACHE_VERSION.to_le_bytes());
}

#[test]
fn test_newer_entry_forces_rebuild() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    let later = SystemTime::now() + Duration::from_secs(3600);
    set_mtime(&dir.path().join("Tools.submenu").join("x.bat"), later);

    let reloaded = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(reloaded.was_rebuilt());
    assert_eq!(reloaded.entries().len(), store.entries().len());
}

#[test]
fn test_added_entry_forces_rebuild() {
    let dir = stack_dir();
    let _ = loaded(dir.path(), StalenessPolicy::Ordered);

    let cache = dir.path().join(CACHE_FILE_NAME);
    touch(&dir.path().join("c.exe"));
    // Keep the cache newer so only the count differs
    set_mtime(&cache, SystemTime::now() + Duration::from_secs(3600));

    let reloaded = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(reloaded.was_rebuilt());
    assert!(reloaded.entries().iter().any(|e| e.name() == "c.exe"));
}

#[test]
fn test_reordered_names_force_rebuild_when_ordered() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    let mut entries = read_entries(store.cache_path());
    entries.swap(1, 2);
    write_entries(store.cache_path(), &entries);
    set_mtime(
        store.cache_path(),
        SystemTime::now() + Duration::from_secs(3600),
    );

    let reloaded = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(reloaded.was_rebuilt());
    assert_eq!(
        reloaded.entries()[1].name(),
        reloaded.scanned().unwrap().names[0]
    );
}

#[test]
fn test_reordered_names_are_accepted_when_unordered() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Unordered);

    let mut entries = read_entries(store.cache_path());
    entries.swap(1, 2);
    write_entries(store.cache_path(), &entries);
    set_mtime(
        store.cache_path(),
        SystemTime::now() + Duration::from_secs(3600),
    );

    let reloaded = loaded(dir.path(), StalenessPolicy::Unordered);
    assert!(!reloaded.was_rebuilt());
    assert_eq!(reloaded.entries()[1].name(), entries[1].name());
}

#[test]
fn test_cache_for_another_folder_is_rebuilt() {
    let dir = stack_dir();
    let store = loaded(dir.path(), StalenessPolicy::Ordered);

    let other = TempDir::new().unwrap();
    for name in ["a.exe", "b.lnk", ".separator"] {
        touch(&other.path().join(name));
    }
    fs::create_dir(other.path().join("Tools.submenu")).unwrap();
    touch(&other.path().join("Tools.submenu").join("x.bat"));
    let copied = other.path().join(CACHE_FILE_NAME);
    fs::copy(store.cache_path(), &copied).unwrap();
    set_mtime(&copied, SystemTime::now() + Duration::from_secs(3600));

    let mut moved = CacheStore::new(other.path());
    moved.scan().unwrap();
    moved.load().unwrap();
    // The copied cache still names the original folder as its root.
    assert!(moved.was_rebuilt());
    assert_eq!(moved.entries()[0].name(), root_entry_name(other.path()));
}

#[test]
fn test_dotted_spelling_of_same_folder_uses_cache() {
    let dir = stack_dir();
    let first = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(first.was_rebuilt());
    let written = fs::read(first.cache_path()).unwrap();

    let dotted = loaded(&dir.path().join("."), StalenessPolicy::Ordered);
    assert!(!dotted.was_rebuilt());
    assert_eq!(dotted.entries(), first.entries());
    assert_eq!(fs::read(dotted.cache_path()).unwrap(), written);
}

#[cfg(unix)]
#[test]
fn test_symlinked_folder_uses_cache() {
    let dir = stack_dir();
    let first = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(first.was_rebuilt());

    let links = TempDir::new().unwrap();
    let link = links.path().join("stack");
    std::os::unix::fs::symlink(dir.path(), &link).unwrap();

    let through_link = loaded(&link, StalenessPolicy::Ordered);
    assert!(!through_link.was_rebuilt());
    assert_eq!(through_link.entries(), first.entries());

    // The root entry still resolves to the folder as it was opened
    let root_id = through_link.entries()[0].id();
    let root = through_link.entry_by_id(root_id).unwrap();
    assert_eq!(through_link.resolve_path(root.name()), link);

    // Loading again through the original path does not rebuild either
    let again = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(!again.was_rebuilt());
}

#[test]
fn test_relative_base_stores_absolute_paths() {
    let dir = tempfile::Builder::new()
        .prefix("rel_stack")
        .tempdir_in(".")
        .unwrap();
    let tools = dir.path().join("Tools.submenu");
    fs::create_dir(&tools).unwrap();
    touch(&tools.join("x.bat"));
    let relative = Path::new(dir.path().file_name().unwrap());
    assert!(relative.is_relative());

    let store = loaded(relative, StalenessPolicy::Ordered);
    assert!(store.base_path().is_absolute());
    assert!(Path::new(store.entries()[0].name()).is_absolute());

    let submenu = store
        .entries()
        .iter()
        .find(|entry| entry.is_submenu())
        .unwrap();
    assert!(submenu.submenu_path().unwrap().is_absolute());
    assert!(store.resolve_path("Tools.submenu\\x.bat").is_absolute());

    // The persisted record carries the absolute path too
    let stored = read_entries(store.cache_path());
    let stored_submenu = stored.iter().find(|entry| entry.is_submenu()).unwrap();
    assert!(stored_submenu.submenu_path().unwrap().is_absolute());
}

#[test]
fn test_explicit_rebuild_rewrites_file() {
    let dir = stack_dir();
    let mut store = loaded(dir.path(), StalenessPolicy::Ordered);
    assert!(store.was_rebuilt());

    let mut store2 = CacheStore::new(dir.path());
    store2.scan().unwrap();
    store2.load().unwrap();
    assert!(!store2.was_rebuilt());

    let report = store.rebuild().unwrap();
    assert!(report.is_clean());
    assert!(store.was_rebuilt());
}
