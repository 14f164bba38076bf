//! The trusted authority ("T"): per-log commitments, opens, closures, and
//! the authoritative final verification.
//!
//! The authority is the sole holder of `B_0` (inside the commitments it
//! retains), which is what makes its verdict final: a compromised auditor
//! can rewrite records and keep the auditor chain consistent, but cannot
//! recompute the trusted chain.

use std::collections::HashMap;

use tracing::{info, warn};

use sealog_chain::primitives::{ct_eq, fwd_key};
use sealog_chain::{verify_from, verify_from_trusted};
use sealog_types::{
    CloseMessage, Error, InitCommitment, Key, OpenMessage, Record, Result, Tag, CLOSE_MSG,
    OPEN_MSG,
};

/// Check that a record sequence ends the way its closure message says it
/// does: same final index, and a literal `CLOSE` body.
pub fn verify_closure(records: &[Record], close: &CloseMessage) -> Result<()> {
    let last = records.last().ok_or(Error::EmptyLog)?;

    if last.index != close.final_index {
        return Err(Error::ClosureMismatch {
            reason: format!(
                "final index {} does not match closure {}",
                last.index, close.final_index
            ),
        });
    }
    if last.msg != CLOSE_MSG {
        return Err(Error::ClosureMismatch {
            reason: "last record is not the CLOSE entry".to_string(),
        });
    }
    Ok(())
}

/// Per-log state held by the trusted authority.
#[derive(Default)]
pub struct TrustedAuthority {
    commitments: HashMap<String, InitCommitment>,
    opens: HashMap<String, OpenMessage>,
    closures: HashMap<String, CloseMessage>,
}

impl TrustedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the initial commitment. Re-registering a log id overwrites
    /// the previous commitment.
    pub fn register_log(&mut self, commit: InitCommitment) {
        info!(log_id = %commit.log_id, "commitment registered");
        self.commitments.insert(commit.log_id.clone(), commit);
    }

    /// Store the opening message.
    pub fn register_open(&mut self, open: OpenMessage) {
        info!(log_id = %open.log_id, first_index = open.first_index, "open registered");
        self.opens.insert(open.log_id.clone(), open);
    }

    /// Store a closure. Fails with `UnknownLog` when no commitment was
    /// ever registered for the log.
    pub fn accept_closure(&mut self, close: CloseMessage) -> Result<()> {
        if !self.commitments.contains_key(&close.log_id) {
            warn!(log_id = %close.log_id, "closure for unregistered log rejected");
            return Err(Error::UnknownLog {
                log_id: close.log_id,
            });
        }
        info!(log_id = %close.log_id, final_index = close.final_index, "closure accepted");
        self.closures.insert(close.log_id.clone(), close);
        Ok(())
    }

    /// The authoritative verdict over a complete record sequence.
    ///
    /// Checks, in order, failing at the first violation:
    ///
    /// 1. commitment and open exist; records are non-empty
    /// 2. the first record is the attested `START` entry
    /// 3. single-step replay of both chains from the seeds reproduces the
    ///    opening tags
    /// 4. a closure exists
    /// 5. the last record is the attested `CLOSE` entry
    /// 6. a full trusted-chain replay from the origin reproduces the
    ///    closure's final tag
    pub fn final_verify(&self, log_id: &str, records: &[Record]) -> Result<()> {
        let commit = self.commitments.get(log_id).ok_or_else(|| Error::UnknownLog {
            log_id: log_id.to_string(),
        })?;
        let open = self.opens.get(log_id).ok_or_else(|| Error::OpeningMismatch {
            reason: "log opening not registered".to_string(),
        })?;

        let first = records.first().ok_or(Error::EmptyLog)?;
        if first.index != open.first_index {
            return Err(Error::OpeningMismatch {
                reason: format!(
                    "first index {} does not match opening {}",
                    first.index, open.first_index
                ),
            });
        }
        if first.msg != OPEN_MSG {
            return Err(Error::OpeningMismatch {
                reason: "first record is not the START entry".to_string(),
            });
        }

        let zero: Tag = [0u8; 32];
        let first_v = verify_from(&records[..1], 0, &commit.key_a0, &zero)?;
        let first_t = verify_from_trusted(&records[..1], 0, &commit.key_b0, &zero)?;
        if !ct_eq(&first_v, &open.first_tag_v) || !ct_eq(&first_t, &open.first_tag_t) {
            return Err(Error::OpeningMismatch {
                reason: "opening tags do not match the attested entry".to_string(),
            });
        }

        let close = self.closures.get(log_id).ok_or(Error::LogNotClosed)?;
        verify_closure(records, close)?;

        let final_t = verify_from_trusted(records, 0, &commit.key_b0, &zero)?;
        if !ct_eq(&final_t, &close.final_tag_t) {
            return Err(Error::ClosureMismatch {
                reason: "final trusted-chain tag does not match the closure".to_string(),
            });
        }

        info!(log_id, record_count = records.len(), "final verification passed");
        Ok(())
    }

    /// Release `A_1 = SHA-256(A_0)` to an authorized auditor.
    ///
    /// Auditors receive the once-evolved key, never the seed — holding
    /// `A_1` lets them verify everything from the first record onward but
    /// never forge an `A_0`-based MAC.
    pub fn release_a1(&self, log_id: &str) -> Result<Key> {
        let commit = self.commitments.get(log_id).ok_or_else(|| Error::UnknownLog {
            log_id: log_id.to_string(),
        })?;
        let mut a1 = commit.key_a0;
        fwd_key(&mut a1);
        Ok(a1)
    }

    /// Compare an auditor-reported aggregate against the authority's own
    /// computation over the same prefix. Divergence means the auditor
    /// "verified" records the trusted chain rejects — a delayed-detection
    /// attack.
    pub fn detect_delayed_attack(&self, _log_id: &str, v_tag: &Tag, t_tag: &Tag) -> bool {
        !ct_eq(&v_tag[..], &t_tag[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn commitment(log_id: &str) -> InitCommitment {
        InitCommitment {
            log_id: log_id.to_string(),
            start_time: Utc::now(),
            key_a0: [0u8; 32],
            key_b0: {
                let mut k = [0u8; 32];
                k[0] = 1;
                k
            },
            update_freq: 1,
        }
    }

    #[test]
    fn closure_for_unknown_log_rejected() {
        let mut authority = TrustedAuthority::new();
        let err = authority
            .accept_closure(CloseMessage {
                log_id: "ghost".to_string(),
                close_time: Utc::now(),
                final_index: 1,
                final_tag_v: [0; 32],
                final_tag_t: [0; 32],
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnknownLog { .. }));
    }

    #[test]
    fn release_a1_is_evolved_seed() {
        let mut authority = TrustedAuthority::new();
        authority.register_log(commitment("log-a"));

        let a1 = authority.release_a1("log-a").unwrap();
        let mut expected = [0u8; 32];
        fwd_key(&mut expected);
        assert_eq!(a1, expected);
        assert_ne!(a1, [0u8; 32], "released key is not the seed");
    }

    #[test]
    fn release_a1_unknown_log() {
        let authority = TrustedAuthority::new();
        assert!(matches!(
            authority.release_a1("nope").unwrap_err(),
            Error::UnknownLog { .. }
        ));
    }

    #[test]
    fn detect_delayed_attack_flags_divergence() {
        let authority = TrustedAuthority::new();
        assert!(!authority.detect_delayed_attack("log", &[7; 32], &[7; 32]));
        assert!(authority.detect_delayed_attack("log", &[7; 32], &[8; 32]));
    }

    #[test]
    fn final_verify_requires_registration() {
        let authority = TrustedAuthority::new();
        let err = authority.final_verify("ghost", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownLog { .. }));
    }

    #[test]
    fn final_verify_requires_records() {
        let mut authority = TrustedAuthority::new();
        authority.register_log(commitment("log-a"));
        authority.register_open(OpenMessage {
            log_id: "log-a".to_string(),
            open_time: Utc::now(),
            first_index: 1,
            first_tag_v: [0; 32],
            first_tag_t: [0; 32],
        });
        let err = authority.final_verify("log-a", &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyLog));
    }

    #[test]
    fn verify_closure_checks_index_and_body() {
        let close = CloseMessage {
            log_id: "log".to_string(),
            close_time: Utc::now(),
            final_index: 2,
            final_tag_v: [0; 32],
            final_tag_t: [0; 32],
        };
        let good = vec![
            Record {
                index: 1,
                ts: 0,
                msg: OPEN_MSG.to_vec(),
                tag_v: [1; 32],
                tag_t: [2; 32],
            },
            Record {
                index: 2,
                ts: 0,
                msg: CLOSE_MSG.to_vec(),
                tag_v: [3; 32],
                tag_t: [4; 32],
            },
        ];
        verify_closure(&good, &close).unwrap();

        let mut wrong_body = good.clone();
        wrong_body[1].msg = b"not close".to_vec();
        assert!(matches!(
            verify_closure(&wrong_body, &close).unwrap_err(),
            Error::ClosureMismatch { .. }
        ));

        let mut wrong_index = good;
        wrong_index[1].index = 9;
        assert!(matches!(
            verify_closure(&wrong_index, &close).unwrap_err(),
            Error::ClosureMismatch { .. }
        ));
    }
}
