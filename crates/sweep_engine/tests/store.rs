use std::fs;

use pretty_assertions::assert_eq;
use sweep_core::{SnapshotKey, Source, SubdomainRecord};
use sweep_engine::{
    ensure_dir, load_records, save_records, AtomicFileWriter, FileStore, KeyValueStore,
    MemoryStore, StoreError,
};
use tempfile::TempDir;

fn sample() -> Vec<SubdomainRecord> {
    vec![
        SubdomainRecord::new("api.example.com", Source::JavaScript, 10)
            .with_origin(Some("www.example.com".to_string())),
        SubdomainRecord::new("cdn.example.net", Source::Css, 11),
    ]
}

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_value() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("subdomains.json", "[]").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "[]");

    let second = writer.write("subdomains.json", "[1]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "[1]");
}

#[test]
fn writer_refuses_a_file_as_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("subdomains.json", "[]").is_err());
    assert!(!file_path.with_file_name("subdomains.json").exists());
}

#[test]
fn file_store_round_trips_both_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path().join("state"));

    save_records(&store, SnapshotKey::Subdomains, &sample()).unwrap();
    save_records(&store, SnapshotKey::PendingSync, &sample()[..1]).unwrap();

    assert!(store.path_for(SnapshotKey::Subdomains).ends_with("subdomains.json"));
    assert!(store.path_for(SnapshotKey::PendingSync).ends_with("pendingSync.json"));
    assert_eq!(load_records(&store, SnapshotKey::Subdomains).unwrap(), sample());
    assert_eq!(
        load_records(&store, SnapshotKey::PendingSync).unwrap(),
        sample()[..1].to_vec()
    );
}

#[test]
fn missing_and_removed_keys_load_empty() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path().to_path_buf());
    assert!(load_records(&store, SnapshotKey::Subdomains).unwrap().is_empty());

    save_records(&store, SnapshotKey::Subdomains, &sample()).unwrap();
    store.remove(SnapshotKey::Subdomains).unwrap();
    store.remove(SnapshotKey::Subdomains).unwrap();
    assert!(load_records(&store, SnapshotKey::Subdomains).unwrap().is_empty());
}

#[test]
fn corrupt_snapshot_is_reported() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path().to_path_buf());
    fs::write(store.path_for(SnapshotKey::PendingSync), "{not json").unwrap();

    let err = load_records(&store, SnapshotKey::PendingSync).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { key: "pendingSync", .. }));
}

#[test]
fn memory_store_replaces_values_wholesale() {
    let store = MemoryStore::new();
    save_records(&store, SnapshotKey::Subdomains, &sample()).unwrap();
    save_records(&store, SnapshotKey::Subdomains, &sample()[1..]).unwrap();
    assert_eq!(
        load_records(&store, SnapshotKey::Subdomains).unwrap(),
        sample()[1..].to_vec()
    );
    assert_eq!(store.load(SnapshotKey::PendingSync).unwrap(), None);
}
