//! # sealog-types
//!
//! Shared types, protocol messages, and error definitions for the sealog
//! workspace.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and the unified error type.

pub mod config;
pub mod error;
pub mod message;
pub mod record;

pub use config::Config;
pub use error::{Error, Result};
pub use message::{CloseMessage, InitCommitment, OpenMessage};
pub use record::{Anchor, Entry, Key, Record, Tag, TailState, KEY_SIZE};

/// The literal message body of the first record in every log.
pub const OPEN_MSG: &[u8] = b"START";

/// The literal message body of the last record in every properly closed log.
pub const CLOSE_MSG: &[u8] = b"CLOSE";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_non_contiguous_display() {
        let err = Error::NonContiguous { have: 3, got: 5 };
        let msg = err.to_string();
        assert!(msg.contains("non-contiguous"));
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn error_gap_display() {
        let err = Error::Gap { expected: 2, got: 7 };
        let msg = err.to_string();
        assert!(msg.contains("gap"));
        assert!(msg.contains('2'));
        assert!(msg.contains('7'));
    }

    #[test]
    fn error_unknown_log_display() {
        let err = Error::UnknownLog {
            log_id: "audit-7".to_string(),
        };
        assert!(err.to_string().contains("audit-7"));
    }

    /// `LogNotClosed` and `TagMismatch` must stay programmatically
    /// distinguishable — callers match on them independently.
    #[test]
    fn error_variants_distinguishable() {
        let not_closed = Error::LogNotClosed;
        let mismatch = Error::TagMismatch;
        assert!(matches!(not_closed, Error::LogNotClosed));
        assert!(matches!(mismatch, Error::TagMismatch));
        assert_ne!(not_closed.to_string(), mismatch.to_string());
    }

    #[test]
    fn record_serde_round_trip() {
        let rec = Record {
            index: 42,
            ts: 1_700_000_000_000_000_000,
            msg: b"user login: alice".to_vec(),
            tag_v: [0xAB; 32],
            tag_t: [0xCD; 32],
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn distinguished_messages_are_exact_bytes() {
        assert_eq!(OPEN_MSG, b"START");
        assert_eq!(CLOSE_MSG, b"CLOSE");
    }
}
