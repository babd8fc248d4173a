//! Tests for mizu-store: reads, writes, defaults, commits and snapshot persistence

use mizu_core::{Error, Scalar, StoreKey, StoreValue};
use mizu_store::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn key(s: &str) -> StoreKey {
    StoreKey::parse(s).unwrap()
}

fn memory_store(backend: &MemoryBackend) -> StateStore {
    StateStore::new("test", Arc::new(backend.clone()))
}

// ===========================================================================
// Reads
// ===========================================================================

#[test]
fn read_missing_key_fails() {
    let store = memory_store(&MemoryBackend::new());
    let err = store.read(&key("water_cooler")).unwrap_err();
    assert!(matches!(err, Error::MissingKey(k) if k.as_str() == "water_cooler"));
}

#[test]
fn read_written_scalar() {
    let mut store = memory_store(&MemoryBackend::new());
    store.write(key("water_cooler"), "0xwc").unwrap();
    assert_eq!(store.read(&key("water_cooler")).unwrap().as_str(), Some("0xwc"));
}

#[test]
fn read_parent_key_returns_record() {
    let mut store = memory_store(&MemoryBackend::new());
    store.write(key("mint.mint_cap"), "0x1").unwrap();
    store.write(key("mint.mint"), "0x2").unwrap();

    let value = store.read(&key("mint")).unwrap();
    let record = value.as_record().unwrap();
    assert_eq!(record.len(), 2);
    assert_eq!(record["mint_cap"], StoreValue::Scalar(Scalar::from("0x1")));
    assert!(store.read_scalar(&key("mint")).is_err());
}

#[test]
fn defaults_fill_missing_reads_but_own_entries_win() {
    let mut defaults = BTreeMap::new();
    defaults.insert(key("packageId"), Scalar::from("0xdefault"));
    defaults.insert(key("collection.supply"), Scalar::from(25u64));
    let mut store = memory_store(&MemoryBackend::new()).with_defaults(defaults);

    assert_eq!(store.read(&key("packageId")).unwrap().as_str(), Some("0xdefault"));
    store.write(key("packageId"), "0xown").unwrap();
    assert_eq!(store.read(&key("packageId")).unwrap().as_str(), Some("0xown"));
    assert_eq!(
        store.read_scalar(&key("collection.supply")).unwrap().as_u64(),
        Some(25)
    );
}

#[tokio::test]
async fn defaults_are_never_flushed() {
    let backend = MemoryBackend::new();
    let mut defaults = BTreeMap::new();
    defaults.insert(key("packageId"), Scalar::from("0xp"));
    let mut store = memory_store(&backend).with_defaults(defaults);
    store.write(key("water_cooler"), "0xwc").unwrap();
    store.flush().await.unwrap();

    assert_eq!(backend.document().await, Some(json!({"water_cooler": "0xwc"})));
}

#[tokio::test]
async fn layered_over_reads_base_store_entries() {
    let admin_backend = MemoryBackend::with_document(json!({
        "packageId": "0xp",
        "cooler_factory": {"CoolerFactory": "0xf"}
    }));
    let admin = StateStore::open("admin", Arc::new(admin_backend)).await.unwrap();
    let user = StateStore::open("user1", Arc::new(MemoryBackend::new()))
        .await
        .unwrap()
        .layered_over(&admin);

    assert_eq!(
        user.read(&key("cooler_factory.CoolerFactory")).unwrap().as_str(),
        Some("0xf")
    );
    assert!(user.is_empty());
}

// ===========================================================================
// Writes
// ===========================================================================

#[test]
fn write_overwrites_and_returns_previous() {
    let mut store = memory_store(&MemoryBackend::new());
    assert!(store.write(key("kiosk"), "0x1").unwrap().is_none());
    assert_eq!(store.write(key("kiosk"), "0x2").unwrap(), Some(Scalar::from("0x1")));
}

#[test]
fn write_rejects_overlapping_keys() {
    let mut store = memory_store(&MemoryBackend::new());
    store.write(key("mint.mint_cap"), "0x1").unwrap();
    let err = store.write(key("mint"), "0x2").unwrap_err();
    assert!(matches!(err, Error::KeyConflict { .. }));
    let err = store.write(key("mint.mint_cap.inner"), "0x3").unwrap_err();
    assert!(matches!(err, Error::KeyConflict { .. }));
}

// ===========================================================================
// Commit
// ===========================================================================

#[tokio::test]
async fn commit_applies_and_flushes_batch() {
    let backend = MemoryBackend::new();
    let mut store = memory_store(&backend);
    let mut batch = BTreeMap::new();
    batch.insert(key("mint.mint"), Scalar::from("0x1"));
    batch.insert(key("mint.mint_cap"), Scalar::from("0x2"));
    store.commit(batch).await.unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(backend.save_count(), 1);
    assert_eq!(
        backend.document().await,
        Some(json!({"mint": {"mint": "0x1", "mint_cap": "0x2"}}))
    );
}

#[tokio::test]
async fn commit_failed_flush_restores_entries() {
    let backend = MemoryBackend::new();
    let mut store = memory_store(&backend);
    store.write(key("water_cooler"), "0xwc").unwrap();
    store.flush().await.unwrap();
    let before = store.snapshot();

    backend.fail_saves(true);
    let mut batch = BTreeMap::new();
    batch.insert(key("kiosk"), Scalar::from("0xk"));
    assert!(store.commit(batch).await.is_err());

    assert_eq!(store.snapshot(), before);
    assert_eq!(backend.document().await, Some(json!({"water_cooler": "0xwc"})));
}

#[tokio::test]
async fn commit_conflicting_batch_applies_nothing() {
    let backend = MemoryBackend::new();
    let mut store = memory_store(&backend);
    let mut batch = BTreeMap::new();
    batch.insert(key("mint"), Scalar::from("0x1"));
    batch.insert(key("mint.mint_cap"), Scalar::from("0x2"));
    assert!(store.commit(batch).await.is_err());
    assert!(store.is_empty());
    assert_eq!(backend.save_count(), 0);
}

// ===========================================================================
// Persistence
// ===========================================================================

#[tokio::test]
async fn json_file_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("user_objects.json");

    let mut store = StateStore::open("user1", Arc::new(JsonFileBackend::new(&path)))
        .await
        .unwrap();
    store.write(key("water_cooler"), "0xwc").unwrap();
    store.write(key("mint.settings"), "0xms").unwrap();
    store.flush().await.unwrap();
    drop(store);

    let reopened = StateStore::open("user1", Arc::new(JsonFileBackend::new(&path)))
        .await
        .unwrap();
    assert_eq!(reopened.read(&key("mint.settings")).unwrap().as_str(), Some("0xms"));
    assert_eq!(reopened.len(), 2);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["mint"]["settings"], "0xms");
}

#[tokio::test]
async fn unflushed_writes_are_lost_on_reopen() {
    let backend = MemoryBackend::new();
    let mut store = memory_store(&backend);
    store.write(key("a"), "1").unwrap();
    store.flush().await.unwrap();
    store.write(key("b"), "2").unwrap();
    drop(store);

    let reopened = StateStore::open("test", Arc::new(backend)).await.unwrap();
    assert!(reopened.contains(&key("a")));
    assert!(!reopened.contains(&key("b")));
}
