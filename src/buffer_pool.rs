use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::config::Config;
use crate::database;
use crate::error::{DbError, DbResult};
use crate::page::{HeapPage, PageId, Permission};
use crate::lock_manager::LockManager;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

struct CacheEntry {
    page: Arc<RwLock<HeapPage>>,
    last_accessed_tick: u64,
}

/// The page cache. Delegates all locking to a `LockManager`; evicts under a
/// NO-STEAL policy (a dirty page is never written to disk ahead of commit,
/// so only clean pages are ever eviction candidates).
pub struct BufferPool {
    cache: Mutex<HashMap<PageId, CacheEntry>>,
    lock_manager: LockManager,
    max_pages: usize,
    clock: AtomicU64,
}

impl BufferPool {
    pub fn new(max_pages: usize) -> Self {
        BufferPool {
            cache: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
            max_pages,
            clock: AtomicU64::new(0),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        BufferPool::new(config.buffer_pool_pages)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Acquires the lock (translating a self-inflicted `Deadlock` into
    /// `TransactionAborted` at this boundary, per the error-handling
    /// design), then returns the cached page, reading it through its
    /// `HeapFile` and evicting to make room on a miss.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> DbResult<Arc<RwLock<HeapPage>>> {
        self.lock_manager
            .acquire(tid, pid, perm)
            .map_err(|e| match e {
                DbError::Deadlock(victim) => DbError::TransactionAborted(victim),
                other => other,
            })?;

        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get_mut(&pid) {
                entry.last_accessed_tick = self.tick();
                return Ok(Arc::clone(&entry.page));
            }
        }

        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let table = catalog
            .get_table_from_id(pid.get_table_id())
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", pid.get_table_id())))?;
        let page = table.read_page(&pid)?;

        let mut cache = self.cache.lock().unwrap();
        if cache.len() >= self.max_pages && !cache.contains_key(&pid) {
            self.evict_one(&mut cache)?;
        }
        let tick = self.tick();
        let handle = Arc::new(RwLock::new(page));
        cache.insert(
            pid,
            CacheEntry {
                page: Arc::clone(&handle),
                last_accessed_tick: tick,
            },
        );
        Ok(handle)
    }

    /// Evicts the oldest-accessed clean page. Fails with `NoCleanPage` if
    /// every resident page is dirty — dirty pages may never be flushed
    /// ahead of their transaction's commit.
    fn evict_one(&self, cache: &mut HashMap<PageId, CacheEntry>) -> DbResult<()> {
        let victim = cache
            .iter()
            .filter(|(_, entry)| entry.page.read().unwrap().is_dirty().is_none())
            .min_by_key(|(_, entry)| entry.last_accessed_tick)
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                cache.remove(&pid);
                log::debug!("evicted clean page {:?}", pid);
                Ok(())
            }
            None => Err(DbError::NoCleanPage),
        }
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: usize, tuple: Tuple) -> DbResult<()> {
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let table = catalog
            .get_table_from_id(table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;
        table.insert_tuple(tid, tuple)?;
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, table_id: usize, tuple: &Tuple) -> DbResult<()> {
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let table = catalog
            .get_table_from_id(table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;
        table.delete_tuple(tid, tuple)?;
        Ok(())
    }

    /// On commit, flushes every page this transaction dirtied and resets
    /// its before-image; on abort, discards those pages from the cache so
    /// the next read re-parses them from disk (the unmodified bytes).
    /// Either way, finishes by calling `LockManager::abort`, which releases
    /// every lock `tid` holds.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let dirtied = self.lock_manager.dirty_pages(tid);
        if commit {
            for pid in dirtied {
                let handle = {
                    let cache = self.cache.lock().unwrap();
                    cache.get(&pid).map(|e| Arc::clone(&e.page))
                };
                if let Some(handle) = handle {
                    let mut page = handle.write().unwrap();
                    if page.is_dirty() == Some(tid) {
                        let db = database::get_global_db();
                        let catalog = db.get_catalog();
                        if let Some(table) = catalog.get_table_from_id(pid.get_table_id()) {
                            table.write_page(&page)?;
                            page.mark_dirty(false, tid);
                            page.set_before_image();
                        }
                    }
                }
            }
        } else {
            let mut cache = self.cache.lock().unwrap();
            for pid in dirtied {
                if let Some(entry) = cache.get(&pid) {
                    if entry.page.read().unwrap().is_dirty() == Some(tid) {
                        cache.remove(&pid);
                    }
                }
            }
        }
        self.lock_manager.abort(tid);
        Ok(())
    }

    /// Writes every dirty resident page. Test-only: production code relies
    /// on `transaction_complete` instead.
    pub fn flush_all_pages(&self) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        for (pid, entry) in cache.iter() {
            let mut page = entry.page.write().unwrap();
            if let Some(dirtying_tid) = page.is_dirty() {
                if let Some(table) = catalog.get_table_from_id(pid.get_table_id()) {
                    table.write_page(&page)?;
                    page.mark_dirty(false, dirtying_tid);
                    page.set_before_image();
                }
            }
        }
        Ok(())
    }

    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().unwrap().remove(&pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> Option<Permission> {
        self.lock_manager.holds_lock(tid, pid)
    }

    pub fn get_num_pages(&self) -> usize {
        self.max_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write as _;

    use rand::Rng;

    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::tuple::{Tuple, TupleDesc};
    use crate::types::Type;

    const TEST_PAGE_SIZE: usize = 8;

    /// Registers a fresh `n_pages`-page table (one int field, one tuple per
    /// page at `TEST_PAGE_SIZE`) under the process-wide catalog, backed by a
    /// file in a scratch `tempfile` directory, and returns its table id.
    /// The tempdir is returned too so it isn't dropped (and deleted) early.
    fn fresh_table(n_pages: usize) -> (tempfile::TempDir, usize) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.dat");

        // Pre-size the file with `n_pages` zeroed pages so `get_page` can
        // read each one back as a valid empty page without ever appending.
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&path)
                .unwrap();
            file.write_all(&vec![0u8; TEST_PAGE_SIZE * n_pages]).unwrap();
        }

        let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let td = TupleDesc::with_capacity(vec![Type::IntType], vec!["v".to_string()], 0);
        let heap_file = HeapFile::new(file, td, &path, TEST_PAGE_SIZE).unwrap();
        let table_id = heap_file.get_id();

        let db = database::get_global_db();
        db.get_catalog()
            .add_table(heap_file, format!("buffer_pool_test_{table_id}"));

        (dir, table_id)
    }

    fn insert_random_tuple(bp: &BufferPool, tid: TransactionId, pid: PageId) {
        let td = TupleDesc::with_capacity(vec![Type::IntType], vec!["v".to_string()], 0);
        let value = rand::thread_rng().gen_range(0..1_000_000);
        let page = bp.get_page(tid, pid, Permission::Write).unwrap();
        let mut page = page.write().unwrap();
        page.insert(Tuple::new(vec![FieldVal::IntField(IntField::new(value))], &td))
            .unwrap();
        page.mark_dirty(true, tid);
    }

    /// S2: with every resident page pinned dirty, a further miss must fail
    /// with `NoCleanPage` rather than evicting a dirty page ahead of commit;
    /// with one clean page resident, eviction must prefer it over a dirty one.
    #[test]
    fn evicts_clean_page_before_dirty_and_refuses_to_evict_all_dirty() {
        let (_dir, table_id) = fresh_table(4);
        let bp = BufferPool::new(2);
        let tid = TransactionId::new();

        let pid0 = PageId::new(table_id, 0);
        let pid1 = PageId::new(table_id, 1);
        let pid2 = PageId::new(table_id, 2);
        let pid3 = PageId::new(table_id, 3);

        insert_random_tuple(&bp, tid, pid0); // dirty, resident
        bp.get_page(tid, pid1, Permission::Read).unwrap(); // clean, resident
        assert_eq!(bp.cache.lock().unwrap().len(), 2);

        // Pool is full with one dirty, one clean page: the clean one must
        // be evicted to make room, never the dirty one.
        bp.get_page(tid, pid2, Permission::Read).unwrap();
        {
            let cache = bp.cache.lock().unwrap();
            assert!(cache.contains_key(&pid0), "dirty page must not be evicted");
            assert!(!cache.contains_key(&pid1), "clean page should have been evicted");
            assert!(cache.contains_key(&pid2));
        }

        // Now dirty the second resident page too, so both are dirty.
        insert_random_tuple(&bp, tid, pid2);
        let result = bp.get_page(tid, pid3, Permission::Read);
        assert!(matches!(result, Err(DbError::NoCleanPage)));
    }

    /// S4: aborting a transaction must discard its inserted tuples from the
    /// cache and leave the on-disk page bytes exactly as they were.
    #[test]
    fn abort_discards_dirty_page_without_writing_to_disk() {
        let (dir, table_id) = fresh_table(1);
        let path = dir.path().join("table.dat");
        let original_bytes = std::fs::read(&path).unwrap();

        let bp = BufferPool::new(2);
        let tid = TransactionId::new();
        let pid = PageId::new(table_id, 0);

        insert_random_tuple(&bp, tid, pid);
        assert!(bp.cache.lock().unwrap().contains_key(&pid));

        bp.transaction_complete(tid, false).unwrap();

        assert!(
            !bp.cache.lock().unwrap().contains_key(&pid),
            "aborted transaction's dirty page must be discarded from the cache"
        );
        assert_eq!(
            std::fs::read(&path).unwrap(),
            original_bytes,
            "an aborted insert must never reach disk"
        );

        // A fresh read must come back from disk with no tuple visible.
        let fresh_tid = TransactionId::new();
        let page = bp.get_page(fresh_tid, pid, Permission::Read).unwrap();
        assert_eq!(page.read().unwrap().iter().count(), 0);
    }
}
