//! # sealog-chain
//!
//! The forward-secure dual MAC chain state machine.
//!
//! ## Overview
//!
//! A log carries two independent MAC chains over the same records: the
//! auditor chain (keys `A_i`, aggregate `μ_V`) for a semi-trusted
//! verifier, and the trusted chain (keys `B_i`, aggregate `μ_T`) for the
//! trusted authority. Keys evolve one-way (`K_i = SHA-256(K_{i-1})`)
//! before every entry, so compromising the current keys never allows
//! forging the past. An auditor that tampers with records can keep `μ_V`
//! consistent — but not `μ_T`, which only the authority can recompute.
//! That asymmetry is the delayed-detection defense.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store: Arc<dyn Store> = Arc::new(FileStore::open(dir)?);
//! let mut logger = Logger::new(Config::default(), store.clone());
//!
//! let (commit, open) = logger.init_protocol("app-log-001")?;
//! logger.append(b"user login: alice", ts)?;
//! let close = logger.close_protocol("app-log-001")?;
//!
//! TrustedVerifier::new(store, commit.key_b0).verify_all()?;
//! ```

pub mod logger;
pub mod primitives;
pub mod traits;
pub mod verifier;
pub mod verify;

#[cfg(test)]
pub(crate) mod testutil;

#[cfg(test)]
mod properties;

pub use logger::Logger;
pub use traits::{RecordIter, Store};
pub use verifier::{AuditorVerifier, TrustedVerifier};
pub use verify::{verify_chain, verify_from, verify_from_trusted, Chain};
