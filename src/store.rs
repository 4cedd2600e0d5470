//! Named persistence slots for pipeline stages.
//!
//! Each slot holds a small JSON metadata envelope plus an optional payload
//! file. Lookups are by slot name; an absent slot is an empty result, not
//! an error. Saving happens explicitly after each pipeline stage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::record::Record;

pub const SLOT_PRIMARY: &str = "primary";
pub const SLOT_SECONDARY: &str = "secondary";
pub const SLOT_UNIFIED: &str = "unified";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotMeta {
    pub name: String,
    pub kind: String,
    pub size: u64,
    pub saved_at: u64,
}

#[derive(Debug, Clone)]
pub struct SlotStore {
    base: PathBuf,
}

impl SlotStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn save(&self, slot: &str, name: &str, kind: &str, payload: &[u8]) -> Result<SlotMeta> {
        fs::create_dir_all(&self.base).with_context(|| {
            format!("failed to create store dir: {}", self.base.display())
        })?;
        let meta = SlotMeta {
            name: name.to_string(),
            kind: kind.to_string(),
            size: payload.len() as u64,
            saved_at: now_unix(),
        };
        let payload_path = self.payload_path(slot);
        fs::write(&payload_path, payload)
            .with_context(|| format!("failed to write payload: {}", payload_path.display()))?;
        let meta_path = self.meta_path(slot);
        let encoded = serde_json::to_vec_pretty(&meta)?;
        fs::write(&meta_path, encoded)
            .with_context(|| format!("failed to write slot meta: {}", meta_path.display()))?;
        Ok(meta)
    }

    pub fn meta(&self, slot: &str) -> Result<Option<SlotMeta>> {
        let path = self.meta_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read slot meta: {}", path.display()))?;
        let meta = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse slot meta: {}", path.display()))?;
        Ok(Some(meta))
    }

    pub fn load(&self, slot: &str) -> Result<Option<(SlotMeta, Vec<u8>)>> {
        let Some(meta) = self.meta(slot)? else {
            return Ok(None);
        };
        let path = self.payload_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let payload = fs::read(&path)
            .with_context(|| format!("failed to read payload: {}", path.display()))?;
        Ok(Some((meta, payload)))
    }

    pub fn clear(&self, slot: &str) -> Result<()> {
        for path in [self.meta_path(slot), self.payload_path(slot)] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove: {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Persists a record sequence into a slot as JSON.
    pub fn save_records(&self, slot: &str, name: &str, records: &[Record]) -> Result<SlotMeta> {
        let payload = serde_json::to_vec(records)?;
        self.save(slot, name, "records", &payload)
    }

    pub fn load_records(&self, slot: &str) -> Result<Option<Vec<Record>>> {
        let Some((_, payload)) = self.load(slot)? else {
            return Ok(None);
        };
        let records = serde_json::from_slice(&payload)
            .with_context(|| format!("failed to parse records in slot '{}'", slot))?;
        Ok(Some(records))
    }

    fn meta_path(&self, slot: &str) -> PathBuf {
        self.base.join(format!("{}.meta.json", slot))
    }

    fn payload_path(&self, slot: &str) -> PathBuf {
        self.base.join(format!("{}.payload", slot))
    }
}

/// Default store location: a dot directory under the user's home, the
/// working directory when no home is known.
pub fn default_store_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| Path::new(&home).join(".catalog-merger-rust"))
        .unwrap_or_else(|| PathBuf::from(".catalog-merger-rust"))
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_slot_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        assert!(store.meta(SLOT_PRIMARY).unwrap().is_none());
        assert!(store.load(SLOT_UNIFIED).unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips_meta_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        let meta = store
            .save(SLOT_PRIMARY, "primary.csv", "text/csv", b"SKU\nA1\n")
            .unwrap();
        assert_eq!(meta.size, 7);
        let (loaded_meta, payload) = store.load(SLOT_PRIMARY).unwrap().unwrap();
        assert_eq!(loaded_meta, meta);
        assert_eq!(payload, b"SKU\nA1\n");
    }

    #[test]
    fn records_round_trip_through_a_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        let records = vec![Record::from_iter([("SKU", "A1"), ("Title", "one")])];
        store.save_records(SLOT_UNIFIED, "unified", &records).unwrap();
        let loaded = store.load_records(SLOT_UNIFIED).unwrap().unwrap();
        assert_eq!(loaded, records);
        let columns: Vec<_> = loaded[0].columns().collect();
        assert_eq!(columns, vec!["SKU", "Title"]);
    }

    #[test]
    fn clear_removes_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        store.save(SLOT_SECONDARY, "s.csv", "text/csv", b"x").unwrap();
        store.clear(SLOT_SECONDARY).unwrap();
        assert!(store.load(SLOT_SECONDARY).unwrap().is_none());
    }
}
