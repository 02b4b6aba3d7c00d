//! Drives `SyncDriver` over two real directories on disk rather than `MemoryBackend` doubles.

use std::fs;

use cuckoo_backend::LocalBackend;
use cuckoo_sync::{SyncAction, SyncDriver};

#[test]
fn pushes_a_real_directory_tree_onto_a_real_destination() {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();

    fs::create_dir_all(src_dir.path().join("docs")).unwrap();
    fs::write(src_dir.path().join("docs/readme.txt"), b"hello cuckoo").unwrap();
    fs::write(src_dir.path().join("root.bin"), vec![7u8; 2048]).unwrap();

    let source = LocalBackend::new("source", src_dir.path()).unwrap();
    let dest = LocalBackend::new("dest", dst_dir.path()).unwrap();

    let events = SyncDriver::new(&source, &dest).run().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.action == SyncAction::Copied));

    assert_eq!(
        fs::read(dst_dir.path().join("docs/readme.txt")).unwrap(),
        b"hello cuckoo"
    );
    assert_eq!(fs::read(dst_dir.path().join("root.bin")).unwrap().len(), 2048);
}

#[test]
fn second_run_with_unchanged_files_skips_everything() {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    fs::write(src_dir.path().join("a.bin"), b"unchanged").unwrap();

    let source = LocalBackend::new("source", src_dir.path()).unwrap();
    let dest = LocalBackend::new("dest", dst_dir.path()).unwrap();

    SyncDriver::new(&source, &dest).run().unwrap();
    let second = SyncDriver::new(&source, &dest).run().unwrap();

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].action, SyncAction::Skipped);
}
