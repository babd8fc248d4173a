//! State store, one per actor session.
//!
//! Two layers: the store's own entries (flushed to its snapshot) and a read-only
//! defaults layer (e.g. the admin deployment seen from a user session). Reads fall
//! through to defaults; writes and flushes only ever touch the own layer.

use crate::backend::SnapshotBackend;
use crate::document::{from_document, to_document};
use mizu_core::{Error, Result, Scalar, StoreKey, StoreValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct StateStore {
    name: String,
    entries: BTreeMap<StoreKey, Scalar>,
    defaults: BTreeMap<StoreKey, Scalar>,
    backend: Arc<dyn SnapshotBackend>,
}

impl StateStore {
    /// Empty store that has never been flushed.
    pub fn new(name: impl Into<String>, backend: Arc<dyn SnapshotBackend>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            defaults: BTreeMap::new(),
            backend,
        }
    }

    /// Load the last flushed snapshot, or start empty if there is none.
    pub async fn open(name: impl Into<String>, backend: Arc<dyn SnapshotBackend>) -> Result<Self> {
        let mut store = Self::new(name, backend);
        if let Some(document) = store.backend.load().await? {
            store.entries = from_document(&document)?;
        }
        info!(
            store = store.name.as_str(),
            location = store.backend.location().as_str(),
            entries = store.entries.len(),
            "state store opened"
        );
        Ok(store)
    }

    /// Add a defaults layer. Existing defaults for the same keys are replaced.
    pub fn with_defaults(mut self, defaults: BTreeMap<StoreKey, Scalar>) -> Self {
        self.defaults.extend(defaults);
        self
    }

    /// Use another store's own entries as this store's defaults.
    pub fn layered_over(self, base: &StateStore) -> Self {
        self.with_defaults(base.entries.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Scalar at `key`, else the record of everything nested under it.
    pub fn read(&self, key: &StoreKey) -> Result<StoreValue> {
        if let Some(v) = self.entries.get(key).or_else(|| self.defaults.get(key)) {
            return Ok(StoreValue::Scalar(v.clone()));
        }
        let record = self.record_under(key);
        if record.is_empty() {
            return Err(Error::MissingKey(key.clone()));
        }
        Ok(StoreValue::Record(record))
    }

    /// Like `read`, but only a scalar is acceptable.
    pub fn read_scalar(&self, key: &StoreKey) -> Result<Scalar> {
        match self.read(key)? {
            StoreValue::Scalar(s) => Ok(s),
            StoreValue::Record(_) => Err(Error::WrongShape {
                key: key.clone(),
                expected: "scalar",
            }),
        }
    }

    pub fn contains(&self, key: &StoreKey) -> bool {
        self.read(key).is_ok()
    }

    /// Upsert into the in-memory entries. Not durable until `flush`.
    pub fn write(&mut self, key: StoreKey, value: impl Into<Scalar>) -> Result<Option<Scalar>> {
        if let Some(existing) = self.entries.keys().find(|k| k.overlaps(&key)) {
            return Err(Error::KeyConflict {
                key,
                existing: existing.clone(),
            });
        }
        Ok(self.entries.insert(key, value.into()))
    }

    pub fn remove(&mut self, key: &StoreKey) -> Option<Scalar> {
        self.entries.remove(key)
    }

    /// Persist the full snapshot of own entries.
    pub async fn flush(&self) -> Result<()> {
        let document = to_document(&self.entries);
        self.backend.save(&document).await?;
        debug!(
            store = self.name.as_str(),
            entries = self.entries.len(),
            "snapshot flushed"
        );
        Ok(())
    }

    /// Apply a batch and flush it, all or nothing.
    ///
    /// If any key conflicts, nothing is applied. If the flush fails, the in-memory
    /// entries are restored to what they were before the call.
    pub async fn commit(&mut self, batch: BTreeMap<StoreKey, Scalar>) -> Result<()> {
        for key in batch.keys() {
            let clash = self
                .entries
                .keys()
                .chain(batch.keys())
                .find(|k| k.overlaps(key));
            if let Some(existing) = clash {
                return Err(Error::KeyConflict {
                    key: key.clone(),
                    existing: existing.clone(),
                });
            }
        }

        let previous = self.entries.clone();
        self.entries.extend(batch);
        if let Err(e) = self.flush().await {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Copy of the own entries (defaults excluded).
    pub fn snapshot(&self) -> BTreeMap<StoreKey, Scalar> {
        self.entries.clone()
    }

    /// Own entries rendered as the nested snapshot document.
    pub fn document(&self) -> serde_json::Value {
        to_document(&self.entries)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&StoreKey, &Scalar)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record_under(&self, key: &StoreKey) -> BTreeMap<String, StoreValue> {
        let mut flat: BTreeMap<&StoreKey, &Scalar> = BTreeMap::new();
        for (k, v) in self.defaults.iter().chain(self.entries.iter()) {
            if key.is_ancestor_of(k) {
                flat.insert(k, v);
            }
        }

        let mut record = BTreeMap::new();
        let skip = key.as_str().len() + 1;
        for (k, v) in flat {
            let rest: Vec<&str> = k.as_str()[skip..].split('.').collect();
            insert_nested(&mut record, &rest, v.clone());
        }
        record
    }
}

fn insert_nested(record: &mut BTreeMap<String, StoreValue>, path: &[&str], value: Scalar) {
    match path {
        [] => {}
        [leaf] => {
            record.insert(leaf.to_string(), StoreValue::Scalar(value));
        }
        [head, rest @ ..] => {
            let child = record
                .entry(head.to_string())
                .or_insert_with(|| StoreValue::Record(BTreeMap::new()));
            if let StoreValue::Scalar(_) = child {
                *child = StoreValue::Record(BTreeMap::new());
            }
            if let StoreValue::Record(map) = child {
                insert_nested(map, rest, value);
            }
        }
    }
}
