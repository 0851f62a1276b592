use std::path::PathBuf;

use file_nav_core::{FileSystem, StdFileSystem};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    p.push(format!("file-nav-core-{prefix}-{pid}-{t}"));
    p
}

#[test]
fn std_fs_read_dir_reports_kinds_and_sizes() {
    let fs = StdFileSystem;
    let dir = unique_temp_dir("read_dir");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("a.txt"), b"hello").unwrap();

    let mut entries = fs.read_dir(&dir).unwrap();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].name, "a.txt");
    assert!(!entries[0].is_dir);
    assert_eq!(entries[0].size, Some(5));
    assert!(entries[0].modified.is_some());

    assert_eq!(entries[1].name, "sub");
    assert!(entries[1].is_dir);
    assert_eq!(entries[1].size, None);
    assert_eq!(entries[1].path, dir.join("sub"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn std_fs_metadata_and_existence() {
    let fs = StdFileSystem;
    let dir = unique_temp_dir("metadata");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("f.bin");
    std::fs::write(&file, [0u8; 3]).unwrap();

    assert!(fs.is_dir(&dir));
    assert!(!fs.is_dir(&file));
    assert_eq!(fs.metadata(&file).unwrap().size, Some(3));

    std::fs::remove_file(&file).unwrap();
    assert!(!fs.exists(&file));
    assert!(fs.metadata(&file).is_err());
    assert!(fs.read_dir(&file).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}
