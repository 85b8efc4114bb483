use crate::dbpath::{self, StoreDirState, StoreMeta, DB_FILE, LOCK_FILE, META_FILE};
use crate::error::Result as StoreResult;
use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadTransaction, WriteTransaction};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Transactional substrate: one redb database plus the namespace tables.
pub struct Store {
    pub store_dir: Option<PathBuf>,
    pub db: Database,
    // Keep the lock file open for the lifetime of Store, so the lock is held.
    _lock_file: Option<File>,
}

/// Open a store directory:
/// - validates directory and its meta.toml
/// - initializes if empty (meta + index.redb)
/// - acquires exclusive lock
/// - opens redb database
pub fn open(store_dir: &Path) -> Result<Store> {
    let state = dbpath::inspect_store_dir(store_dir)?;

    // Acquire lock first (prevents two processes initializing concurrently).
    let lock_file = open_and_lock(store_dir)?;

    let created = state == StoreDirState::Empty;
    if created {
        init_store_dir(store_dir)
            .with_context(|| format!("Failed to initialize store in {}", store_dir.display()))?;
    }

    let db_file_path = store_dir.join(DB_FILE);
    let meta_path = store_dir.join(META_FILE);
    if !db_file_path.is_file() || !meta_path.is_file() {
        return Err(anyhow!(
            "Store directory is missing expected files ({} and {})",
            META_FILE,
            DB_FILE
        ));
    }

    let db = Database::create(&db_file_path)
        .with_context(|| format!("Failed to open redb file {}", db_file_path.display()))?;

    let store = Store {
        store_dir: Some(store_dir.to_path_buf()),
        db,
        _lock_file: Some(lock_file),
    };
    store.ensure_schema()?;

    tracing::debug!(store_dir = %store_dir.display(), created, "store opened");
    Ok(store)
}

impl Store {
    /// Throwaway store backed by memory only.
    pub fn in_memory() -> Result<Store> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context("Failed to create in-memory redb")?;
        let store = Store {
            store_dir: None,
            db,
            _lock_file: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn ensure_schema(&self) -> Result<()> {
        let tx = self.db.begin_write().context("begin_write() failed")?;
        {
            let _ = tx.open_table(crate::schema::NODES)?;
            let _ = tx.open_table(crate::schema::KV_U64)?;
            let _ = tx.open_table(crate::schema::DATA)?;
        }
        tx.commit().context("commit() failed")?;
        Ok(())
    }

    /// Run `f` in one write transaction. Commits on `Ok`, aborts on `Err`;
    /// nothing `f` wrote is visible unless it succeeds.
    pub fn transact<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&WriteTransaction) -> StoreResult<T>,
    {
        let tx = self.db.begin_write()?;
        match f(&tx) {
            Ok(out) => {
                tx.commit()?;
                Ok(out)
            }
            Err(e) => {
                if let Err(abort) = tx.abort() {
                    tracing::warn!(error = %abort, "abort() failed");
                }
                Err(e)
            }
        }
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&ReadTransaction) -> StoreResult<T>,
    {
        let tx = self.db.begin_read()?;
        f(&tx)
    }
}

fn open_and_lock(store_dir: &Path) -> Result<File> {
    let lock_path = store_dir.join(LOCK_FILE);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

    // Exclusive lock: one writer process at a time.
    f.try_lock_exclusive()
        .with_context(|| format!("Store is locked (in use?): {}", store_dir.display()))?;

    Ok(f)
}

fn init_store_dir(store_dir: &Path) -> Result<()> {
    let meta_path = store_dir.join(META_FILE);
    if !meta_path.exists() {
        write_meta(&meta_path)?;
    }

    let db_file_path = store_dir.join(DB_FILE);
    if !db_file_path.exists() {
        let _ = Database::create(&db_file_path)
            .with_context(|| format!("Failed to initialize redb at {}", db_file_path.display()))?;
    }

    Ok(())
}

fn write_meta(meta_path: &Path) -> Result<()> {
    let mut f = File::create(meta_path)
        .with_context(|| format!("Failed to create {}", meta_path.display()))?;

    f.write_all(StoreMeta::current().render().as_bytes())
        .with_context(|| format!("Failed to write {}", meta_path.display()))?;

    f.sync_all()
        .with_context(|| format!("Failed to sync {}", meta_path.display()))?;

    Ok(())
}
