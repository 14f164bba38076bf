//! Replay verification of record sequences.
//!
//! Verification recomputes exactly what `Logger::append` computed: evolve
//! the key, MAC the record fields, fold into the aggregate, and compare
//! against the stored tag. It fails fast at the first inconsistent record
//! — any modification, reorder, gap, or truncation surfaces as `Gap` or
//! `TagMismatch`.

use sealog_types::{Error, Key, Record, Result, Tag};

use crate::primitives::{ct_eq, fold, fwd_key, htag, is_zero, mac};

/// Which of the two stored tags a replay is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// The auditor (V) chain: stored tag is `Record::tag_v`.
    Auditor,
    /// The trusted (T) chain: stored tag is `Record::tag_t`.
    Trusted,
}

/// Replay `records` starting from `(start_idx, start_key, start_tag)` and
/// check every recomputed aggregate against the selected stored tag.
///
/// Record indices must begin at `start_idx + 1` and be contiguous. A zero
/// `start_tag` means "no aggregate yet" (origin replay); the first step
/// then uses `H(τ)` instead of the fold, mirroring the append path.
///
/// Returns the final aggregate tag — for an empty sequence, the starting
/// tag unchanged.
pub fn verify_chain(
    records: &[Record],
    start_idx: u64,
    start_key: &Key,
    start_tag: &Tag,
    chain: Chain,
) -> Result<Tag> {
    let mut key = *start_key;
    let mut prev = *start_tag;
    let mut expected = start_idx;

    for record in records {
        expected += 1;
        if record.index != expected {
            return Err(Error::Gap {
                expected,
                got: record.index,
            });
        }

        fwd_key(&mut key);

        let tau = mac(
            &key,
            &[
                &record.index.to_be_bytes(),
                &(record.ts as u64).to_be_bytes(),
                &record.msg,
            ],
        );

        let tag = if is_zero(&prev) {
            htag(&tau)
        } else {
            fold(&prev, &tau)
        };

        let stored = match chain {
            Chain::Auditor => &record.tag_v,
            Chain::Trusted => &record.tag_t,
        };
        if !ct_eq(&tag, &stored[..]) {
            return Err(Error::TagMismatch);
        }

        prev = tag;
    }

    Ok(prev)
}

/// Replay the auditor (V) chain. This is what a semi-trusted auditor runs
/// with the key material it has been given.
pub fn verify_from(
    records: &[Record],
    start_idx: u64,
    start_key: &Key,
    start_tag: &Tag,
) -> Result<Tag> {
    verify_chain(records, start_idx, start_key, start_tag, Chain::Auditor)
}

/// Replay the trusted (T) chain. Only the trusted authority holds the
/// key material for this one.
pub fn verify_from_trusted(
    records: &[Record],
    start_idx: u64,
    start_key: &Key,
    start_tag: &Tag,
) -> Result<Tag> {
    verify_chain(records, start_idx, start_key, start_tag, Chain::Trusted)
}
