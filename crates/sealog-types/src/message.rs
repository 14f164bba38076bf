//! Protocol messages exchanged between the logger and the trusted authority.
//!
//! Three messages cover the whole lifecycle: `InitCommitment` (before the
//! first append), `OpenMessage` (after the `START` entry), `CloseMessage`
//! (after the `CLOSE` entry). All three are transported out-of-band by a
//! `Transport` implementation and retained by the authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Key, Tag};

/// The initial commitment handed to the trusted authority at log creation.
///
/// Holds both chain seeds. Possession of this message is what makes the
/// authority's final verdict authoritative: `key_a0` and `key_b0` uniquely
/// reconstruct both chains given the record sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitCommitment {
    /// Caller-chosen opaque log identifier.
    pub log_id: String,

    /// Wall-clock time the log was created.
    pub start_time: DateTime<Utc>,

    /// `A_0` — seed of the auditor chain.
    pub key_a0: Key,

    /// `B_0` — seed of the trusted chain.
    pub key_b0: Key,

    /// Advertised key update frequency. Informational only.
    pub update_freq: u64,
}

/// Attests the first real record: the `START` entry at index 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenMessage {
    pub log_id: String,
    pub open_time: DateTime<Utc>,

    /// Index of the opening entry.
    pub first_index: u64,

    /// `μ_V` after the opening entry.
    pub first_tag_v: Tag,

    /// `μ_T` after the opening entry.
    pub first_tag_t: Tag,
}

/// Attests the last record: the `CLOSE` entry.
///
/// Absence of a stored `CloseMessage` is how abnormal termination is
/// distinguished from a proper closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseMessage {
    pub log_id: String,
    pub close_time: DateTime<Utc>,

    /// Index of the final entry.
    pub final_index: u64,

    /// `μ_V` over the whole log.
    pub final_tag_v: Tag,

    /// `μ_T` over the whole log.
    pub final_tag_t: Tag,
}
