//! POSIX file-backed store with a pinned big-endian binary layout.
//!
//! Three files per log directory:
//!
//! - `logs.dat` — concatenated record entries:
//!   `u64 index ‖ i64 ts ‖ u32 msg_len ‖ msg ‖ 32 tag_v ‖ 32 tag_t`
//! - `anchors.idx` — fixed 104-byte entries:
//!   `u64 index ‖ 32 key ‖ 32 tag_v ‖ 32 tag_t`
//! - `tail.dat` — exactly 72 bytes, rewritten in place:
//!   `u64 index ‖ 32 tag_v ‖ 32 tag_t`
//!
//! Files are created 0600 inside a 0700 directory. Each append takes an
//! exclusive advisory lock on the log file, writes, and fsyncs the log,
//! anchor, and tail files in that order — the tail never advertises a
//! record the log does not durably hold.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fs2::FileExt;
use tracing::debug;

use sealog_chain::{RecordIter, Store};
use sealog_types::{Anchor, Error, Record, Result, TailState};

const LOGS_FILE: &str = "logs.dat";
const ANCHORS_FILE: &str = "anchors.idx";
const TAIL_FILE: &str = "tail.dat";

// idx + ts + msg_len
const HEADER_SIZE: usize = 8 + 8 + 4;
// tag_v + tag_t
const TAGS_SIZE: usize = 32 + 32;
// idx + key + tag_v + tag_t
const ANCHOR_ENTRY_SIZE: usize = 8 + 32 + 32 + 32;
// idx + tag_v + tag_t
const TAIL_ENTRY_SIZE: usize = 8 + 32 + 32;

/// Store backed by append-only files in a single directory.
///
/// One writer, many readers: appends serialize on the internal write lock
/// (plus the advisory file lock for cross-process exclusion); reads open
/// their own handles and never disturb the writer's cursor.
pub struct FileStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Create or open a file store rooted at `dir`.
    ///
    /// Creates the directory (mode 0700) and the three backing files
    /// (mode 0600) if they do not yet exist.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
        }

        // Touch all three files up front so later opens cannot race on
        // creation modes.
        for name in [LOGS_FILE, ANCHORS_FILE, TAIL_FILE] {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .mode(0o600)
                .open(dir.join(name))?;
        }

        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    fn open_rw(&self, name: &str) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(self.dir.join(name))?)
    }

    /// Index of the last record in `logs.dat`, or 0 when empty.
    ///
    /// Walks the whole file; record entries are variable-length, so there
    /// is no way to seek straight to the last header.
    fn last_index(log: &mut File) -> Result<u64> {
        let len = log.metadata()?.len();
        if len == 0 {
            return Ok(0);
        }

        log.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(log);
        let mut last = 0u64;
        let mut pos = 0u64;

        while pos < len {
            let mut header = [0u8; HEADER_SIZE];
            reader.read_exact(&mut header)?;
            last = u64::from_be_bytes(header[0..8].try_into().expect("8-byte slice"));
            let msg_len = u32::from_be_bytes(header[16..20].try_into().expect("4-byte slice"));

            let skip = msg_len as i64 + TAGS_SIZE as i64;
            reader.seek_relative(skip)?;
            pos += (HEADER_SIZE + msg_len as usize + TAGS_SIZE) as u64;
        }

        Ok(last)
    }
}

impl Store for FileStore {
    fn append(&self, record: Record, tail: TailState, anchor: Option<Anchor>) -> Result<()> {
        let _guard = self.lock.write().expect("file store lock poisoned");

        let mut log = self.open_rw(LOGS_FILE)?;
        log.lock_exclusive()?;
        let result = append_locked(&mut log, self, &record, &tail, anchor.as_ref());
        let _ = FileExt::unlock(&log);
        result?;

        debug!(index = record.index, anchored = anchor.is_some(), "record persisted");
        Ok(())
    }

    /// Snapshot-at-start: a fresh read handle, bounded by the file length
    /// observed here. Appends made after this call stay invisible to the
    /// returned iterator.
    fn iter(&self, start_idx: u64) -> Result<RecordIter> {
        let _guard = self.lock.read().expect("file store lock poisoned");

        let file = File::open(self.dir.join(LOGS_FILE))?;
        let limit = file.metadata()?.len();
        Ok(Box::new(FileIter {
            reader: BufReader::new(file),
            limit,
            pos: 0,
            start_idx,
        }))
    }

    fn anchor_at(&self, index: u64) -> Result<Option<Anchor>> {
        let _guard = self.lock.read().expect("file store lock poisoned");

        let file = File::open(self.dir.join(ANCHORS_FILE))?;
        let mut reader = BufReader::new(file);
        let mut buf = [0u8; ANCHOR_ENTRY_SIZE];

        // The file is append-only, so a later entry at the same index
        // supersedes an earlier one. Scan to the end.
        let mut found = None;
        while let ReadOutcome::Full = read_full(&mut reader, &mut buf)? {
            let anchor = decode_anchor(&buf);
            if anchor.index == index {
                found = Some(anchor);
            }
        }
        Ok(found)
    }

    fn list_anchors(&self) -> Result<Vec<Anchor>> {
        let _guard = self.lock.read().expect("file store lock poisoned");

        let file = File::open(self.dir.join(ANCHORS_FILE))?;
        let mut reader = BufReader::new(file);
        let mut buf = [0u8; ANCHOR_ENTRY_SIZE];

        // Later entries replace earlier ones at the same index.
        let mut anchors = std::collections::BTreeMap::new();
        while let ReadOutcome::Full = read_full(&mut reader, &mut buf)? {
            let anchor = decode_anchor(&buf);
            anchors.insert(anchor.index, anchor);
        }
        Ok(anchors.into_values().collect())
    }

    fn tail(&self) -> Result<Option<TailState>> {
        let _guard = self.lock.read().expect("file store lock poisoned");

        let mut file = File::open(self.dir.join(TAIL_FILE))?;
        let mut buf = [0u8; TAIL_ENTRY_SIZE];
        match read_full(&mut file, &mut buf)? {
            ReadOutcome::Eof => Ok(None),
            ReadOutcome::Full => Ok(Some(TailState {
                index: u64::from_be_bytes(buf[0..8].try_into().expect("8-byte slice")),
                tag_v: buf[8..40].try_into().expect("32-byte slice"),
                tag_t: buf[40..72].try_into().expect("32-byte slice"),
            })),
        }
    }
}

/// The transactional body of an append, run under both locks.
fn append_locked(
    log: &mut File,
    store: &FileStore,
    record: &Record,
    tail: &TailState,
    anchor: Option<&Anchor>,
) -> Result<()> {
    let have = FileStore::last_index(log)?;
    if have != record.index.wrapping_sub(1) {
        return Err(Error::NonContiguous {
            have,
            got: record.index,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + record.msg.len() + TAGS_SIZE);
    buf.extend_from_slice(&record.index.to_be_bytes());
    buf.extend_from_slice(&record.ts.to_be_bytes());
    buf.extend_from_slice(&(record.msg.len() as u32).to_be_bytes());
    buf.extend_from_slice(&record.msg);
    buf.extend_from_slice(&record.tag_v);
    buf.extend_from_slice(&record.tag_t);

    log.seek(SeekFrom::End(0))?;
    log.write_all(&buf)?;
    log.sync_all()?;

    if let Some(a) = anchor {
        let mut abuf = [0u8; ANCHOR_ENTRY_SIZE];
        abuf[0..8].copy_from_slice(&a.index.to_be_bytes());
        abuf[8..40].copy_from_slice(&a.key);
        abuf[40..72].copy_from_slice(&a.tag_v);
        abuf[72..104].copy_from_slice(&a.tag_t);

        let mut anchors = store.open_rw(ANCHORS_FILE)?;
        anchors.seek(SeekFrom::End(0))?;
        anchors.write_all(&abuf)?;
        anchors.sync_all()?;
    }

    let mut tbuf = [0u8; TAIL_ENTRY_SIZE];
    tbuf[0..8].copy_from_slice(&tail.index.to_be_bytes());
    tbuf[8..40].copy_from_slice(&tail.tag_v);
    tbuf[40..72].copy_from_slice(&tail.tag_t);

    let mut tail_file = store.open_rw(TAIL_FILE)?;
    tail_file.set_len(0)?;
    tail_file.seek(SeekFrom::Start(0))?;
    tail_file.write_all(&tbuf)?;
    tail_file.sync_all()?;

    Ok(())
}

fn decode_anchor(buf: &[u8; ANCHOR_ENTRY_SIZE]) -> Anchor {
    Anchor {
        index: u64::from_be_bytes(buf[0..8].try_into().expect("8-byte slice")),
        key: buf[8..40].try_into().expect("32-byte slice"),
        tag_v: buf[40..72].try_into().expect("32-byte slice"),
        tag_t: buf[72..104].try_into().expect("32-byte slice"),
    }
}

enum ReadOutcome {
    Full,
    Eof,
}

/// `read_exact` that distinguishes clean EOF (nothing read) from a
/// torn entry (partial read), which is a decode error.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(ReadOutcome::Eof);
            }
            return Err(Error::Decode {
                reason: format!("truncated entry: {filled} of {} bytes", buf.len()),
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

/// Lazy record reader over a snapshot of `logs.dat`.
struct FileIter {
    reader: BufReader<File>,
    /// File length when the iterator was created; bytes past it belong to
    /// appends that happened after the snapshot.
    limit: u64,
    pos: u64,
    start_idx: u64,
}

impl FileIter {
    fn read_record(&mut self) -> Result<Option<Record>> {
        if self.pos >= self.limit {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            ReadOutcome::Eof => return Ok(None),
            ReadOutcome::Full => {}
        }

        let index = u64::from_be_bytes(header[0..8].try_into().expect("8-byte slice"));
        let ts = i64::from_be_bytes(header[8..16].try_into().expect("8-byte slice"));
        let msg_len = u32::from_be_bytes(header[16..20].try_into().expect("4-byte slice")) as usize;

        let mut msg = vec![0u8; msg_len];
        if msg_len > 0 {
            if let ReadOutcome::Eof = read_full(&mut self.reader, &mut msg)? {
                return Err(Error::Decode {
                    reason: "record body missing".to_string(),
                });
            }
        }

        let mut tags = [0u8; TAGS_SIZE];
        if let ReadOutcome::Eof = read_full(&mut self.reader, &mut tags)? {
            return Err(Error::Decode {
                reason: "record tags missing".to_string(),
            });
        }

        self.pos += (HEADER_SIZE + msg_len + TAGS_SIZE) as u64;

        Ok(Some(Record {
            index,
            ts,
            msg,
            tag_v: tags[0..32].try_into().expect("32-byte slice"),
            tag_t: tags[32..64].try_into().expect("32-byte slice"),
        }))
    }
}

impl Iterator for FileIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_record() {
                Ok(Some(record)) if record.index < self.start_idx => continue,
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => return None,
                Err(e) => {
                    // Poison the iterator: report the error once, then end.
                    self.pos = self.limit;
                    return Some(Err(e));
                }
            }
        }
    }
}
