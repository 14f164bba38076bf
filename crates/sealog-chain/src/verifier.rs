//! The two verifying parties, as thin drivers over [`crate::verify`].
//!
//! `AuditorVerifier` is the semi-trusted party V: it holds auditor-chain
//! material (`A_i` from an anchor, or `A_0` outright) and checks `μ_V`.
//! `TrustedVerifier` is the authority T: sole holder of `B_0`, it checks
//! `μ_T`, which a malicious auditor cannot recompute. Both stream records
//! out of a store and finish by comparing the replayed aggregate against
//! the stored tail — which is what catches truncation.

use std::sync::Arc;

use sealog_types::{Anchor, Error, Key, Record, Result, Tag};

use crate::primitives::ct_eq;
use crate::traits::Store;
use crate::verify::{verify_from, verify_from_trusted};

/// Semi-trusted auditor (V). Can validate the auditor chain; cannot forge
/// the trusted chain.
pub struct AuditorVerifier {
    store: Arc<dyn Store>,
}

impl AuditorVerifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Verify all records after `anchor` against the auditor chain, then
    /// check the final aggregate against the stored tail.
    ///
    /// An anchor at index 0 with a zero tag verifies from the origin given
    /// `A_0`.
    pub fn verify_from_anchor(&self, anchor: &Anchor) -> Result<()> {
        let records = collect(self.store.as_ref(), anchor.index + 1)?;
        let final_tag = verify_from(&records, anchor.index, &anchor.key, &anchor.tag_v)?;

        let tail = self.store.tail()?.ok_or(Error::TailUnavailable)?;
        if !ct_eq(&final_tag, &tail.tag_v) {
            return Err(Error::TagMismatch);
        }
        Ok(())
    }
}

/// The trusted authority's verifier (T). Holds `B_0`; its verdict cannot
/// be forged by a compromised auditor.
pub struct TrustedVerifier {
    store: Arc<dyn Store>,
    key_b0: Key,
}

impl TrustedVerifier {
    pub fn new(store: Arc<dyn Store>, key_b0: Key) -> Self {
        Self { store, key_b0 }
    }

    /// Replay the entire log from the origin on the trusted chain and
    /// check the result against the stored tail.
    pub fn verify_all(&self) -> Result<()> {
        let records = collect(self.store.as_ref(), 1)?;
        let final_tag = verify_from_trusted(&records, 0, &self.key_b0, &[0u8; 32])?;

        let tail = self.store.tail()?.ok_or(Error::TailUnavailable)?;
        if !ct_eq(&final_tag, &tail.tag_t) {
            return Err(Error::TagMismatch);
        }
        Ok(())
    }

    /// Resume trusted-chain verification from a checkpoint `(i, B_i,
    /// μ_T,i)`.
    ///
    /// Anchors never carry `B_i`, so the checkpoint state must come from
    /// the authority's own records.
    pub fn verify_from_checkpoint(&self, index: u64, key_bi: &Key, tag_t: &Tag) -> Result<()> {
        let records = collect(self.store.as_ref(), index + 1)?;
        let final_tag = verify_from_trusted(&records, index, key_bi, tag_t)?;

        let tail = self.store.tail()?.ok_or(Error::TailUnavailable)?;
        if !ct_eq(&final_tag, &tail.tag_t) {
            return Err(Error::TagMismatch);
        }
        Ok(())
    }
}

/// Drain a store iterator into memory. The verifiers replay over slices;
/// `verify_chain` itself is slice-based so a streaming caller can feed it
/// incrementally instead.
fn collect(store: &dyn Store, start_idx: u64) -> Result<Vec<Record>> {
    store.iter(start_idx)?.collect()
}
