//! The unified error type for the sealog workspace.
//!
//! All fallible operations return `Result<T>`. Variants carry enough
//! context to act on programmatically — in particular `LogNotClosed` and
//! `TagMismatch` are independently matchable, and the server layer maps
//! variants onto HTTP semantics without string inspection.

use thiserror::Error;

/// Everything that can go wrong across the logger, stores, verifiers,
/// protocol driver, and transports.
#[derive(Debug, Error)]
pub enum Error {
    /// An append whose index does not immediately follow the stored maximum.
    #[error("non-contiguous append: store has {have}, record carries {got}")]
    NonContiguous { have: u64, got: u64 },

    /// A verifier observed a missing or reordered record index.
    #[error("gap or reordering detected: expected index {expected}, got {got}")]
    Gap { expected: u64, got: u64 },

    /// A recomputed chain tag disagrees with the stored tag — tampering or
    /// a wrong key.
    #[error("tag mismatch: tampering or wrong key")]
    TagMismatch,

    /// A trusted-authority operation referenced an unregistered log.
    #[error("log '{log_id}' is not registered with the trusted authority")]
    UnknownLog { log_id: String },

    /// Final verification was requested but no closure has been recorded.
    #[error("log has not been closed")]
    LogNotClosed,

    /// An append was attempted after the log was closed and its keys zeroed.
    #[error("log has been closed; no further appends are accepted")]
    LogClosed,

    /// The first record does not match the stored `OpenMessage`.
    #[error("opening mismatch: {reason}")]
    OpeningMismatch { reason: String },

    /// The last record does not match the stored `CloseMessage`.
    #[error("closure mismatch: {reason}")]
    ClosureMismatch { reason: String },

    /// A wire payload could not be decoded.
    #[error("decode error: {reason}")]
    Decode { reason: String },

    /// A storage transaction exceeded its time budget.
    #[error("storage transaction timed out")]
    Timeout,

    /// The store has no tail slot to compare a replay against.
    #[error("tail state unavailable")]
    TailUnavailable,

    /// Verification was requested over an empty record sequence.
    #[error("no records to verify")]
    EmptyLog,

    /// Underlying persistence failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A storage backend failure that is not a plain I/O error.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A transport-level failure talking to the trusted authority.
    #[error("transport error: {reason}")]
    Transport { reason: String },
}

/// Convenience alias used throughout the sealog crates.
pub type Result<T> = std::result::Result<T, Error>;
