//! Folder-based transport: the trusted authority as a directory tree.
//!
//! Self-contained deployments (development, tests, single machines) keep
//! everything under one root:
//!
//! ```text
//! {base}/commitments/{log_id}.bin   InitCommitment, native encoding
//! {base}/opens/{log_id}.bin         OpenMessage
//! {base}/closures/{log_id}.bin      CloseMessage
//! {base}/logs/{log_id}/             record storage (FileStore layout)
//! ```
//!
//! Sharing a filesystem between U and T weakens the trust split; real
//! deployments put the authority behind the HTTP transport instead.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use sealog_store::FileStore;
use sealog_types::{CloseMessage, Error, InitCommitment, OpenMessage, Record, Result};
use sealog_wire::{decode, encode, NATIVE_EXT};

use crate::authority::TrustedAuthority;
use crate::transport::Transport;

const COMMITMENTS_DIR: &str = "commitments";
const OPENS_DIR: &str = "opens";
const CLOSURES_DIR: &str = "closures";
const LOGS_DIR: &str = "logs";

/// Transport that writes protocol messages into a shared folder layout.
pub struct FolderTransport {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl FolderTransport {
    /// Create the directory structure under `base_dir` (mode 0700) and
    /// return the transport.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        for sub in [COMMITMENTS_DIR, OPENS_DIR, CLOSURES_DIR, LOGS_DIR] {
            let dir = base_dir.join(sub);
            if !dir.exists() {
                fs::DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
            }
        }
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    fn message_path(&self, sub: &str, log_id: &str) -> PathBuf {
        self.base_dir.join(sub).join(format!("{log_id}.{NATIVE_EXT}"))
    }

    fn write_message<T: serde::Serialize>(&self, sub: &str, log_id: &str, value: &T) -> Result<()> {
        let _guard = self.lock.lock().expect("folder transport lock poisoned");
        fs::write(self.message_path(sub, log_id), encode(value)?)?;
        Ok(())
    }

    fn read_message<T: serde::de::DeserializeOwned>(&self, sub: &str, log_id: &str) -> Result<T> {
        let _guard = self.lock.lock().expect("folder transport lock poisoned");
        let bytes = fs::read(self.message_path(sub, log_id))?;
        decode(&bytes)
    }

    /// Read back a stored commitment.
    pub fn load_commitment(&self, log_id: &str) -> Result<InitCommitment> {
        self.read_message(COMMITMENTS_DIR, log_id)
            .map_err(|e| not_found_as(e, || Error::UnknownLog {
                log_id: log_id.to_string(),
            }))
    }

    /// Read back a stored opening message.
    pub fn load_open(&self, log_id: &str) -> Result<OpenMessage> {
        self.read_message(OPENS_DIR, log_id)
            .map_err(|e| not_found_as(e, || Error::OpeningMismatch {
                reason: "log opening not recorded".to_string(),
            }))
    }

    /// Read back a stored closure. A missing closure file means the log
    /// was never properly closed.
    pub fn load_closure(&self, log_id: &str) -> Result<CloseMessage> {
        self.read_message(CLOSURES_DIR, log_id)
            .map_err(|e| not_found_as(e, || Error::LogNotClosed))
    }

    /// Open the record store for `log_id` under the shared layout.
    pub fn log_store(&self, log_id: &str) -> Result<FileStore> {
        FileStore::open(self.base_dir.join(LOGS_DIR).join(log_id))
    }

    /// Final trusted-chain verification for a log held in the folder:
    /// reassemble an authority from the stored messages and run the full
    /// check over the stored records.
    pub fn verify_log(&self, log_id: &str) -> Result<()> {
        let commit = self.load_commitment(log_id)?;
        let open = self.load_open(log_id)?;
        let close = self.load_closure(log_id)?;

        let store = self.log_store(log_id)?;
        let records: Vec<Record> = {
            use sealog_chain::Store;
            store.iter(1)?.collect::<Result<_>>()?
        };

        let mut authority = TrustedAuthority::new();
        authority.register_log(commit);
        authority.register_open(open);
        authority.accept_closure(close)?;
        authority.final_verify(log_id, &records)?;

        info!(log_id, record_count = records.len(), "folder log verified");
        Ok(())
    }
}

/// Map a file-not-found I/O error onto a protocol-level meaning; leave
/// everything else untouched.
fn not_found_as(e: Error, missing: impl FnOnce() -> Error) -> Error {
    match &e {
        Error::Io(io) if io.kind() == ErrorKind::NotFound => missing(),
        _ => e,
    }
}

impl Transport for FolderTransport {
    fn send_commitment(&self, commit: &InitCommitment) -> Result<()> {
        self.write_message(COMMITMENTS_DIR, &commit.log_id, commit)
    }

    fn send_open(&self, open: &OpenMessage) -> Result<()> {
        self.write_message(OPENS_DIR, &open.log_id, open)
    }

    fn send_closure(&self, close: &CloseMessage) -> Result<()> {
        self.write_message(CLOSURES_DIR, &close.log_id, close)
    }

    /// Records already live in the shared layout; submitting the log is a
    /// full verification pass over the folder's own copy.
    fn send_log(&self, log_id: &str, _records: &[Record]) -> Result<bool> {
        match self.verify_log(log_id) {
            Ok(()) => Ok(true),
            Err(Error::Io(e)) => Err(Error::Io(e)),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn creates_layout_with_private_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("authority");
        FolderTransport::new(&root).unwrap();

        for sub in ["commitments", "opens", "closures", "logs"] {
            let meta = fs::metadata(root.join(sub)).unwrap();
            assert!(meta.is_dir());
            assert_eq!(meta.permissions().mode() & 0o777, 0o700);
        }
    }

    #[test]
    fn messages_round_trip_through_folder() {
        let dir = TempDir::new().unwrap();
        let transport = FolderTransport::new(dir.path()).unwrap();

        let commit = InitCommitment {
            log_id: "app-log-001".to_string(),
            start_time: Utc::now(),
            key_a0: [0xAA; 32],
            key_b0: [0xBB; 32],
            update_freq: 1,
        };
        transport.send_commitment(&commit).unwrap();
        assert_eq!(transport.load_commitment("app-log-001").unwrap(), commit);

        let open = OpenMessage {
            log_id: "app-log-001".to_string(),
            open_time: Utc::now(),
            first_index: 1,
            first_tag_v: [1; 32],
            first_tag_t: [2; 32],
        };
        transport.send_open(&open).unwrap();
        assert_eq!(transport.load_open("app-log-001").unwrap(), open);
    }

    #[test]
    fn missing_closure_reads_as_log_not_closed() {
        let dir = TempDir::new().unwrap();
        let transport = FolderTransport::new(dir.path()).unwrap();
        let err = transport.load_closure("never-closed").unwrap_err();
        assert!(matches!(err, Error::LogNotClosed));
    }

    #[test]
    fn missing_commitment_reads_as_unknown_log() {
        let dir = TempDir::new().unwrap();
        let transport = FolderTransport::new(dir.path()).unwrap();
        let err = transport.load_commitment("ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownLog { .. }));
    }
}
