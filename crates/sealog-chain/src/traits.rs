//! The persistence seam between the logger and its storage backends.
//!
//! The chain state machine treats storage as an abstract interface; the
//! concrete backings (binary files, SQLite, in-memory) live in
//! `sealog-store` and must be observably indistinguishable through this
//! trait.

use sealog_types::{Anchor, Record, Result, TailState};

/// A lazy, ascending stream of records.
///
/// The underlying file handle or cursor is released when the iterator is
/// dropped. Iterators observe a snapshot taken when they were created —
/// appends made after `iter` returns are not visible through it.
pub type RecordIter = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Durable append-only record log with an anchor index and a single-slot
/// tail state.
pub trait Store: Send + Sync {
    /// Atomically persist three effects in one durable transaction:
    /// append `record`, overwrite the tail slot with `tail`, and — when
    /// present — insert or replace the anchor keyed by its index.
    ///
    /// Fails with `Error::NonContiguous` when the stored maximum index is
    /// not `record.index - 1`. On any error the transaction has no visible
    /// effect. Implementations must fsync (or equivalent) before returning
    /// success.
    fn append(&self, record: Record, tail: TailState, anchor: Option<Anchor>) -> Result<()>;

    /// Stream records with `index >= start_idx` in ascending order.
    ///
    /// Reading concurrently with appends is permitted.
    fn iter(&self, start_idx: u64) -> Result<RecordIter>;

    /// Look up the anchor at exactly `index`.
    fn anchor_at(&self, index: u64) -> Result<Option<Anchor>>;

    /// All anchors, ascending by index.
    fn list_anchors(&self) -> Result<Vec<Anchor>>;

    /// The current tail state, or `None` before the first append.
    fn tail(&self) -> Result<Option<TailState>>;
}
