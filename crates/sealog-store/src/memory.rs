//! In-memory implementation of `Store`.
//!
//! `MemoryStore` is the reference implementation: no durability, but the
//! same contiguity checking and snapshot iteration semantics as the
//! durable backends. Used by tests and by in-process deployments where
//! the log's lifetime is the process's.

use std::collections::BTreeMap;
use std::sync::Mutex;

use sealog_chain::{RecordIter, Store};
use sealog_types::{Anchor, Error, Record, Result, TailState};

struct Inner {
    records: Vec<Record>,
    anchors: BTreeMap<u64, Anchor>,
    tail: Option<TailState>,
}

/// An append-only record log held entirely in memory.
///
/// # Thread safety
///
/// All operations acquire an internal `Mutex`; the store may be shared
/// freely behind an `Arc`.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                anchors: BTreeMap::new(),
                tail: None,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn append(&self, record: Record, tail: TailState, anchor: Option<Anchor>) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");

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

    /// Snapshot-at-start: the returned iterator walks a copy taken under
    /// the lock and never observes later appends.
    fn iter(&self, start_idx: u64) -> Result<RecordIter> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        let snapshot: Vec<Record> = inner
            .records
            .iter()
            .filter(|r| r.index >= start_idx)
            .cloned()
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn anchor_at(&self, index: u64) -> Result<Option<Anchor>> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner.anchors.get(&index).copied())
    }

    fn list_anchors(&self) -> Result<Vec<Anchor>> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner.anchors.values().copied().collect())
    }

    fn tail(&self) -> Result<Option<TailState>> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner.tail)
    }
}
