//! Authoritative collection store.
//!
//! Two journaled tables: posts, and transactions carrying a required
//! reference to their post. Reads take a shared lock and run concurrently;
//! mutations are serialized by a write lock and journaled before the
//! in-memory tables change, so a mutation that fails to reach disk leaves
//! no trace in memory either.

mod journal;
mod tables;

pub use journal::{Journal, JournalOp};

use crate::error::{FeedError, Result};
use crate::types::{
    Post, PostId, PostInput, PostPatch, Timestamp, Transaction, TransactionId, TransactionInput,
    TransactionPatch,
};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tables::Tables;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base path for the store directory.
    pub path: PathBuf,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./feed"),
            create_if_missing: true,
        }
    }
}

/// Magic bytes for the store manifest.
const STORE_MAGIC: &[u8; 4] = b"LFS\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// The authoritative backing store for posts and their transactions.
#[derive(Debug)]
pub struct CollectionStore {
    /// Lock file for exclusive access.
    _lock_file: File,

    /// Durable change journal.
    journal: Journal,

    /// In-memory tables, rebuilt from the journal on open.
    tables: RwLock<Tables>,

    /// Serializes mutations so journal order matches table order.
    write_lock: Mutex<()>,
}

impl CollectionStore {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.path.exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(FeedError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;
        let (journal, tables) = Self::load(&config.path)?;

        tracing::info!(path = %config.path.display(), "created feed store");

        Ok(Self {
            _lock_file: lock_file,
            journal,
            tables: RwLock::new(tables),
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing store, replaying the journal.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;
        let (journal, tables) = Self::load(&config.path)?;

        tracing::info!(
            path = %config.path.display(),
            posts = tables.count_posts(),
            "opened feed store"
        );

        Ok(Self {
            _lock_file: lock_file,
            journal,
            tables: RwLock::new(tables),
            write_lock: Mutex::new(()),
        })
    }

    /// Open the journal and rebuild the tables from it.
    fn load(path: &Path) -> Result<(Journal, Tables)> {
        let (journal, ops) = Journal::open(path.join("feed.journal"))?;
        let mut tables = Tables::new();
        for op in &ops {
            tables.apply(op);
        }
        Ok((journal, tables))
    }

    // --- Post operations ---

    /// Posts with id strictly below `after` (from the top when absent or
    /// zero), newest first, at most `limit`.
    pub fn list_posts(&self, limit: usize, after: Option<PostId>) -> Vec<Post> {
        self.tables.read().list_posts(limit, after)
    }

    /// Total number of posts.
    pub fn count_posts(&self) -> u64 {
        self.tables.read().count_posts()
    }

    /// Number of posts with id strictly below `cursor`.
    pub fn count_posts_below(&self, cursor: PostId) -> u64 {
        self.tables.read().count_posts_below(cursor)
    }

    pub fn get_post(&self, id: PostId) -> Option<Post> {
        self.tables.read().get_post(id).cloned()
    }

    /// Insert a post, assigning its id and timestamps.
    pub fn create_post(&self, input: PostInput) -> Result<PostId> {
        let _guard = self.write_lock.lock();

        let id = self.tables.read().peek_post_id();
        let now = Timestamp::now();
        let post = Post {
            id,
            title: input.title,
            content: input.content,
            created: now,
            updated: now,
        };

        let op = JournalOp::InsertPost { post };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(id)
    }

    /// Apply a patch to a post. Returns `false` when the post is missing.
    pub fn update_post(&self, id: PostId, patch: &PostPatch) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let mut post = match self.tables.read().get_post(id) {
            Some(post) => post.clone(),
            None => return Ok(false),
        };
        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(content) = &patch.content {
            post.content = content.clone();
        }
        post.updated = Timestamp::now();

        let op = JournalOp::UpdatePost { post };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(true)
    }

    /// Delete a post and, in the same committed op, all its transactions.
    /// Returns `false` when the post is missing.
    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let _guard = self.write_lock.lock();

        if self.tables.read().get_post(id).is_none() {
            return Ok(false);
        }

        let op = JournalOp::DeletePost { id };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(true)
    }

    // --- Transaction operations ---

    /// Transactions grouped by post, in the caller's post order; insertion
    /// order within each group.
    pub fn transactions_for_posts(&self, post_ids: &[PostId]) -> Vec<(PostId, Vec<Transaction>)> {
        self.tables.read().transactions_for_posts(post_ids)
    }

    pub fn get_transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.tables.read().get_transaction(id).cloned()
    }

    /// Insert a transaction. Fails with [`FeedError::MissingPost`] when the
    /// referenced post does not exist.
    pub fn create_transaction(&self, input: TransactionInput) -> Result<TransactionId> {
        let _guard = self.write_lock.lock();

        let id = {
            let tables = self.tables.read();
            if tables.get_post(input.post_id).is_none() {
                return Err(FeedError::MissingPost(input.post_id));
            }
            tables.peek_transaction_id()
        };

        let now = Timestamp::now();
        let transaction = Transaction {
            id,
            post_id: input.post_id,
            content: input.content,
            balance: input.balance,
            time_stamp: input.time_stamp,
            created: now,
            updated: now,
        };

        let op = JournalOp::InsertTransaction { transaction };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(id)
    }

    /// Apply a patch to a transaction. Returns `false` when it is missing.
    pub fn update_transaction(&self, id: TransactionId, patch: &TransactionPatch) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let mut transaction = match self.tables.read().get_transaction(id) {
            Some(transaction) => transaction.clone(),
            None => return Ok(false),
        };
        if let Some(content) = &patch.content {
            transaction.content = content.clone();
        }
        if let Some(balance) = &patch.balance {
            transaction.balance = balance.clone();
        }
        if let Some(time_stamp) = &patch.time_stamp {
            transaction.time_stamp = time_stamp.clone();
        }
        transaction.updated = Timestamp::now();

        let op = JournalOp::UpdateTransaction { transaction };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(true)
    }

    /// Delete a transaction. Returns `false` when it is missing.
    pub fn delete_transaction(&self, id: TransactionId) -> Result<bool> {
        let _guard = self.write_lock.lock();

        if self.tables.read().get_transaction(id).is_none() {
            return Ok(false);
        }

        let op = JournalOp::DeleteTransaction { id };
        self.journal.append(&op)?;
        self.tables.write().apply(&op);

        Ok(true)
    }

    // --- Internals ---

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let manifest_path = path.join("MANIFEST");
        if !manifest_path.exists() {
            return Err(FeedError::NotInitialized);
        }

        let mut file = File::open(manifest_path)?;
        let mut header = [0u8; 5];
        file.read_exact(&mut header)?;

        if &header[0..4] != STORE_MAGIC {
            return Err(FeedError::InvalidFormat("Invalid store magic".into()));
        }
        if header[4] != STORE_VERSION {
            return Err(FeedError::InvalidFormat(format!(
                "Unsupported store version: {}",
                header[4]
            )));
        }
        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join("LOCK"))?;
        lock_file.try_lock_exclusive().map_err(|_| FeedError::Locked)?;
        Ok(lock_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> CollectionStore {
        CollectionStore::create(StoreConfig {
            path: dir.path().join("feed"),
            create_if_missing: true,
        })
        .unwrap()
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let first = store.create_post(PostInput::new("a", "1")).unwrap();
        let second = store.create_post(PostInput::new("b", "2")).unwrap();
        assert_eq!(first, PostId(1));
        assert_eq!(second, PostId(2));

        let post = store.get_post(second).unwrap();
        assert_eq!(post.title, "b");
        assert!(post.updated >= post.created);
    }

    #[test]
    fn test_update_missing_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let patched = store
            .update_post(PostId(99), &PostPatch::default().title("x"))
            .unwrap();
        assert!(!patched);
        assert!(!store.delete_post(PostId(99)).unwrap());
    }

    #[test]
    fn test_cascade_delete() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let post_id = store.create_post(PostInput::new("p", "c")).unwrap();
        for i in 0..3 {
            store
                .create_transaction(TransactionInput::new(post_id, format!("tx{i}"), "0", "123"))
                .unwrap();
        }

        assert!(store.delete_post(post_id).unwrap());
        assert!(store.get_post(post_id).is_none());
        let grouped = store.transactions_for_posts(&[post_id]);
        assert!(grouped[0].1.is_empty());
        assert!(store.get_transaction(TransactionId(1)).is_none());
    }

    #[test]
    fn test_transaction_requires_post() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let err = store
            .create_transaction(TransactionInput::new(PostId(5), "tx", "0", "123"))
            .unwrap_err();
        assert!(matches!(err, FeedError::MissingPost(PostId(5))));
    }

    #[test]
    fn test_reopen_replays_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed");

        {
            let store = CollectionStore::create(StoreConfig {
                path: path.clone(),
                create_if_missing: true,
            })
            .unwrap();
            let post_id = store.create_post(PostInput::new("a", "1")).unwrap();
            store
                .create_transaction(TransactionInput::new(post_id, "tx", "10", "123"))
                .unwrap();
            store
                .update_post(post_id, &PostPatch::default().content("edited"))
                .unwrap();
            store.create_post(PostInput::new("b", "2")).unwrap();
            store.delete_post(PostId(2)).unwrap();
        }

        let store = CollectionStore::open(StoreConfig {
            path,
            create_if_missing: false,
        })
        .unwrap();

        assert_eq!(store.count_posts(), 1);
        let post = store.get_post(PostId(1)).unwrap();
        assert_eq!(post.content, "edited");
        assert_eq!(store.transactions_for_posts(&[PostId(1)])[0].1.len(), 1);

        // Id assignment continues past the deleted post.
        let next = store.create_post(PostInput::new("c", "3")).unwrap();
        assert_eq!(next, PostId(3));
    }

    #[test]
    fn test_second_open_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed");

        let _store = CollectionStore::create(StoreConfig {
            path: path.clone(),
            create_if_missing: true,
        })
        .unwrap();

        let err = CollectionStore::open(StoreConfig {
            path,
            create_if_missing: false,
        })
        .unwrap_err();
        assert!(matches!(err, FeedError::Locked));
    }

    #[test]
    fn test_open_missing_without_create_fails() {
        let dir = TempDir::new().unwrap();
        let err = CollectionStore::open_or_create(StoreConfig {
            path: dir.path().join("absent"),
            create_if_missing: false,
        })
        .unwrap_err();
        assert!(matches!(err, FeedError::NotInitialized));
    }
}
