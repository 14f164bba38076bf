//! Record, tail, and anchor types.
//!
//! Everything here is fixed-width except the message body. `Record` is the
//! persisted tuple; `TailState` is the single-slot aggregate the store
//! rewrites on every append; `Anchor` is the optional checkpoint published
//! every `anchor_every` entries.

use serde::{Deserialize, Serialize};

/// Size in bytes of all keys and aggregate tags (SHA-256 output size).
pub const KEY_SIZE: usize = 32;

/// An evolving chain key: `A_i` on the auditor chain, `B_i` on the trusted
/// chain.
pub type Key = [u8; KEY_SIZE];

/// A 32-byte aggregate chain tag (`μ_V,i` or `μ_T,i`).
pub type Tag = [u8; 32];

/// The persisted form of one log entry.
///
/// Both aggregate tags are committed with every record: `tag_v` binds the
/// record into the auditor chain, `tag_t` into the trusted chain. The two
/// are never equal; they are derived from independent key chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Position in the log, strictly monotonic and contiguous from 1.
    pub index: u64,

    /// Timestamp in nanoseconds since the unix epoch.
    pub ts: i64,

    /// The message body. Owned, decoupled from caller buffers at append.
    pub msg: Vec<u8>,

    /// `μ_V,i` — aggregate tag of the auditor (V) chain at this entry.
    pub tag_v: Tag,

    /// `μ_T,i` — aggregate tag of the trusted (T) chain at this entry.
    pub tag_t: Tag,
}

/// The authenticated entry returned to callers of `append`.
///
/// Carries the auditor-chain aggregate; the trusted-chain aggregate is
/// deliberately not handed back on the append path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub index: u64,
    pub ts: i64,
    pub msg: Vec<u8>,
    pub tag: Tag,
}

/// Aggregate state of the log tail: the most recent committed append.
///
/// The store holds exactly one of these, rewritten in place per append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailState {
    pub index: u64,
    pub tag_v: Tag,
    pub tag_t: Tag,
}

/// A verification checkpoint.
///
/// Anchors carry the auditor key `A_i` so an offline auditor can resume
/// replay mid-chain. They never carry `B_i`: exposing it would let a
/// compromised auditor forge the trusted chain from that point forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// The entry this checkpoint was taken at.
    pub index: u64,

    /// `A_i`, the auditor chain key after the evolution at `index`.
    pub key: Key,

    /// `μ_V,i` at `index`. Equals the record's `tag_v`.
    pub tag_v: Tag,

    /// `μ_T,i` at `index`. Equals the record's `tag_t`.
    pub tag_t: Tag,
}
