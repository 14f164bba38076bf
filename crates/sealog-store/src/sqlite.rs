//! SQLite-backed store.
//!
//! One table per concern — `logs`, `tail` (single row), `anchors` — with
//! every append running in a single IMMEDIATE transaction. Durability
//! comes from `journal_mode=WAL` plus `synchronous=FULL`; the 5-second
//! transaction budget is enforced through `busy_timeout`, and a budget
//! overrun surfaces as `Error::Timeout` with no partial writes.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::debug;

use sealog_chain::{RecordIter, Store};
use sealog_types::{Anchor, Error, Key, Record, Result, Tag, TailState, KEY_SIZE};

/// Transaction time budget, in milliseconds, applied as `busy_timeout`.
const BUSY_TIMEOUT_MS: u32 = 5_000;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logs (
  idx   INTEGER PRIMARY KEY,
  ts    INTEGER NOT NULL,
  msg   BLOB    NOT NULL,
  tag_v BLOB    NOT NULL,
  tag_t BLOB    NOT NULL
);
CREATE TABLE IF NOT EXISTS tail (
  id    INTEGER PRIMARY KEY CHECK(id = 1),
  idx   INTEGER NOT NULL,
  tag_v BLOB    NOT NULL,
  tag_t BLOB    NOT NULL
);
CREATE TABLE IF NOT EXISTS anchors (
  idx   INTEGER PRIMARY KEY,
  key   BLOB NOT NULL,
  tag_v BLOB NOT NULL,
  tag_t BLOB NOT NULL
);
";

/// Store backed by an embedded SQLite database.
///
/// The connection lives behind a `Mutex`; SQLite serializes writers
/// anyway, and readers here take snapshots rather than holding cursors
/// across the lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at `path` and ensure schema + PRAGMAs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::setup(Connection::open(path).map_err(db_err)?)
    }

    /// Fully in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::setup(Connection::open_in_memory().map_err(db_err)?)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "FULL").map_err(db_err)?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(db_err)?;
        conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
            .map_err(db_err)?;
        conn.pragma_update(None, "wal_autocheckpoint", 1000)
            .map_err(db_err)?;

        conn.execute_batch(SCHEMA).map_err(db_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn append(&self, record: Record, tail: TailState, anchor: Option<Anchor>) -> Result<()> {
        let mut conn = self.conn.lock().expect("sqlite store lock poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let have: i64 = tx
            .query_row("SELECT COALESCE(MAX(idx), 0) FROM logs", [], |row| row.get(0))
            .map_err(db_err)?;
        if have as u64 != record.index.wrapping_sub(1) {
            return Err(Error::NonContiguous {
                have: have as u64,
                got: record.index,
            });
        }

        tx.execute(
            "INSERT INTO logs(idx, ts, msg, tag_v, tag_t) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                record.index as i64,
                record.ts,
                record.msg,
                &record.tag_v[..],
                &record.tag_t[..],
            ],
        )
        .map_err(db_err)?;

        if let Some(a) = anchor {
            tx.execute(
                "INSERT INTO anchors(idx, key, tag_v, tag_t) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(idx) DO UPDATE SET
                   key = excluded.key, tag_v = excluded.tag_v, tag_t = excluded.tag_t",
                params![a.index as i64, &a.key[..], &a.tag_v[..], &a.tag_t[..]],
            )
            .map_err(db_err)?;
        }

        tx.execute(
            "INSERT INTO tail(id, idx, tag_v, tag_t) VALUES(1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               idx = excluded.idx, tag_v = excluded.tag_v, tag_t = excluded.tag_t",
            params![tail.index as i64, &tail.tag_v[..], &tail.tag_t[..]],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;

        debug!(index = record.index, "record committed");
        Ok(())
    }

    /// Materializes the matching rows inside the connection lock and
    /// iterates the snapshot — database isolation supplies the
    /// snapshot-at-start semantics.
    fn iter(&self, start_idx: u64) -> Result<RecordIter> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let mut stmt = conn
            .prepare("SELECT idx, ts, msg, tag_v, tag_t FROM logs WHERE idx >= ?1 ORDER BY idx ASC")
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![start_idx as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (idx, ts, msg, tag_v, tag_t) = row.map_err(db_err)?;
            records.push(Record {
                index: idx as u64,
                ts,
                msg,
                tag_v: blob32(&tag_v, "tag_v")?,
                tag_t: blob32(&tag_t, "tag_t")?,
            });
        }

        Ok(Box::new(records.into_iter().map(Ok)))
    }

    fn anchor_at(&self, index: u64) -> Result<Option<Anchor>> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let row = conn
            .query_row(
                "SELECT idx, key, tag_v, tag_t FROM anchors WHERE idx = ?1",
                params![index as i64],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(idx, key, tag_v, tag_t)| {
            Ok(Anchor {
                index: idx as u64,
                key: key32(&key)?,
                tag_v: blob32(&tag_v, "tag_v")?,
                tag_t: blob32(&tag_t, "tag_t")?,
            })
        })
        .transpose()
    }

    fn list_anchors(&self) -> Result<Vec<Anchor>> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let mut stmt = conn
            .prepare("SELECT idx, key, tag_v, tag_t FROM anchors ORDER BY idx ASC")
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut anchors = Vec::new();
        for row in rows {
            let (idx, key, tag_v, tag_t) = row.map_err(db_err)?;
            anchors.push(Anchor {
                index: idx as u64,
                key: key32(&key)?,
                tag_v: blob32(&tag_v, "tag_v")?,
                tag_t: blob32(&tag_t, "tag_t")?,
            });
        }
        Ok(anchors)
    }

    fn tail(&self) -> Result<Option<TailState>> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let row = conn
            .query_row(
                "SELECT idx, tag_v, tag_t FROM tail WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(idx, tag_v, tag_t)| {
            Ok(TailState {
                index: idx as u64,
                tag_v: blob32(&tag_v, "tag_v")?,
                tag_t: blob32(&tag_t, "tag_t")?,
            })
        })
        .transpose()
    }
}

/// Map rusqlite errors onto the domain: lock/budget overruns become
/// `Timeout`, everything else `Storage`.
fn db_err(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        if matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ) {
            return Error::Timeout;
        }
    }
    Error::Storage {
        reason: e.to_string(),
    }
}

fn blob32(bytes: &[u8], field: &str) -> Result<Tag> {
    bytes.try_into().map_err(|_| Error::Storage {
        reason: format!("invalid {field} size: expected 32, got {}", bytes.len()),
    })
}

fn key32(bytes: &[u8]) -> Result<Key> {
    bytes.try_into().map_err(|_| Error::Storage {
        reason: format!("invalid key size: expected {KEY_SIZE}, got {}", bytes.len()),
    })
}
