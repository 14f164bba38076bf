//! Test support: a minimal in-memory store and fixed seeds.
//!
//! The full-featured `MemoryStore` lives in `sealog-store`; depending on
//! it from here would be circular, so the chain tests carry their own
//! small double with the same observable behavior.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use sealog_types::{Anchor, Config, Error, Key, Record, Result, TailState};

use crate::traits::{RecordIter, Store};

/// Fixed auditor-chain seed used across the chain tests.
pub const A0: Key = [0u8; 32];

/// Fixed trusted-chain seed: first byte 1, rest zero.
pub const B0: Key = {
    let mut k = [0u8; 32];
    k[0] = 1;
    k
};

/// Config with the fixed seeds and the given anchor cadence.
pub fn seeded_config(anchor_every: u64) -> Config {
    Config {
        anchor_every,
        initial_key_v: Some(A0),
        initial_key_t: Some(B0),
    }
}

#[derive(Default)]
struct Inner {
    records: Vec<Record>,
    anchors: BTreeMap<u64, Anchor>,
    tail: Option<TailState>,
}

/// Contiguity-checking in-memory store.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

pub fn mem_store() -> Arc<MemStore> {
    Arc::new(MemStore::default())
}

impl Store for MemStore {
    fn append(&self, record: Record, tail: TailState, anchor: Option<Anchor>) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let have = inner.records.last().map(|r| r.index).unwrap_or(0);
        if have != record.index.wrapping_sub(1) {
            return Err(Error::NonContiguous {
                have,
                got: record.index,
            });
        }
        inner.records.push(record);
        if let Some(a) = anchor {
            inner.anchors.insert(a.index, a);
        }
        inner.tail = Some(tail);
        Ok(())
    }

    fn iter(&self, start_idx: u64) -> Result<RecordIter> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let snapshot: Vec<Record> = inner
            .records
            .iter()
            .filter(|r| r.index >= start_idx)
            .cloned()
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn anchor_at(&self, index: u64) -> Result<Option<Anchor>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.anchors.get(&index).copied())
    }

    fn list_anchors(&self) -> Result<Vec<Anchor>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.anchors.values().copied().collect())
    }

    fn tail(&self) -> Result<Option<TailState>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.tail)
    }
}

/// A store whose every append fails, for rollback tests.
pub struct FailStore;

pub fn failing_store() -> Arc<FailStore> {
    Arc::new(FailStore)
}

impl Store for FailStore {
    fn append(&self, _: Record, _: TailState, _: Option<Anchor>) -> Result<()> {
        Err(Error::Storage {
            reason: "injected failure".to_string(),
        })
    }

    fn iter(&self, _: u64) -> Result<RecordIter> {
        Ok(Box::new(std::iter::empty()))
    }

    fn anchor_at(&self, _: u64) -> Result<Option<Anchor>> {
        Ok(None)
    }

    fn list_anchors(&self) -> Result<Vec<Anchor>> {
        Ok(Vec::new())
    }

    fn tail(&self) -> Result<Option<TailState>> {
        Ok(None)
    }
}

/// All records of a store, in order.
pub fn records_of(store: &Arc<MemStore>) -> Vec<Record> {
    store
        .iter(1)
        .expect("mem store iter cannot fail")
        .map(|r| r.expect("mem store yields no errors"))
        .collect()
}
