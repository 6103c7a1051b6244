//! Append-only change journal backing the collection store.
//!
//! Every committed mutation is appended as one frame before the in-memory
//! tables change. Opening a store replays the journal to rebuild the
//! tables, so the journal is the single durable representation of both
//! collections.

use crate::error::{FeedError, Result};
use crate::types::{Post, PostId, Transaction, TransactionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for the journal file.
const JOURNAL_MAGIC: &[u8; 4] = b"LFJ\0";

/// Current journal format version.
const JOURNAL_VERSION: u8 = 1;

/// Header size: magic + version.
const HEADER_SIZE: u64 = 5;

/// Sanity bound on a single frame.
const MAX_FRAME_BYTES: usize = 100 * 1024 * 1024;

/// A single journaled mutation.
///
/// Ops carry the record as committed (id and timestamps already assigned)
/// so replay reproduces the tables byte for byte. Post deletion cascades
/// during replay exactly as it did at commit time, so only the id is kept.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JournalOp {
    InsertPost { post: Post },
    UpdatePost { post: Post },
    DeletePost { id: PostId },
    InsertTransaction { transaction: Transaction },
    UpdateTransaction { transaction: Transaction },
    DeleteTransaction { id: TransactionId },
}

/// Append-only journal manager.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl Journal {
    /// Create a new journal or open an existing one, returning the ops to
    /// replay.
    ///
    /// A torn or corrupt trailing frame ends the replay; the file is
    /// truncated back to the last good frame so later appends follow it.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<JournalOp>)> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            file.write_all(JOURNAL_MAGIC)?;
            file.write_all(&[JOURNAL_VERSION])?;
            file.sync_all()?;

            let writer = BufWriter::new(OpenOptions::new().append(true).open(&path)?);
            return Ok((
                Self {
                    path,
                    writer: Mutex::new(writer),
                },
                Vec::new(),
            ));
        }

        let file = OpenOptions::new().read(true).open(&path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != JOURNAL_MAGIC {
            return Err(FeedError::InvalidFormat("Invalid journal magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != JOURNAL_VERSION {
            return Err(FeedError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                version[0]
            )));
        }

        let mut ops = Vec::new();
        let mut good_end = HEADER_SIZE;
        loop {
            match Self::read_frame(&mut reader) {
                Ok(op) => {
                    ops.push(op);
                    good_end = reader.stream_position()?;
                }
                Err(_) => break,
            }
        }

        let file = OpenOptions::new().write(true).open(&path)?;
        if file.metadata()?.len() > good_end {
            tracing::warn!(
                path = %path.display(),
                bytes = file.metadata()?.len() - good_end,
                "truncating torn journal tail"
            );
            file.set_len(good_end)?;
            file.sync_all()?;
        }

        let writer = BufWriter::new(OpenOptions::new().append(true).open(&path)?);
        Ok((
            Self {
                path,
                writer: Mutex::new(writer),
            },
            ops,
        ))
    }

    /// Append one op and sync it to disk.
    pub fn append(&self, op: &JournalOp) -> Result<()> {
        let encoded = rmp_serde::to_vec(op)?;

        let mut writer = self.writer.lock();
        writer.write_all(&(encoded.len() as u32).to_le_bytes())?;
        writer.write_all(&encoded)?;
        writer.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        Ok(())
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_frame(reader: &mut BufReader<File>) -> Result<JournalOp> {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_FRAME_BYTES {
            return Err(FeedError::Corruption("Journal frame too large".into()));
        }

        let mut encoded = vec![0u8; len];
        reader.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);

        if stored != crc32fast::hash(&encoded) {
            return Err(FeedError::Corruption("Journal checksum mismatch".into()));
        }

        Ok(rmp_serde::from_slice(&encoded)?)
    }
}
