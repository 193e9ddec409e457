use std::sync::Arc;

use lazy_static::lazy_static;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config::Config;

lazy_static! {
    static ref GLOBAL_DB: Arc<Database> = Arc::new(Database::new());
}

/// Returns the process-wide `Database` singleton, initialized on first use.
pub fn get_global_db() -> Arc<Database> {
    Arc::clone(&GLOBAL_DB)
}

/// The root handle tying together the catalog, buffer pool, and the
/// configuration they were built from. Most code reaches these through
/// [`get_global_db`]. `Database::new`/`with_config` build an independent
/// value with its own `Config` and empty `Catalog`/`BufferPool` — useful in
/// tests that just need a config-driven `BufferPool` (e.g. a specific
/// `buffer_pool_pages`) without touching `RUSTYDB_*` env vars. It is not a
/// full isolation boundary: `HeapFile`/`BufferPool` methods that resolve a
/// table by id (`get_page`, `insert_tuple`, scans, ...) look it up through
/// [`get_global_db`]'s catalog rather than through `self`, so a table must
/// still be registered on the process-wide singleton to be readable through
/// any `Database`'s buffer pool, including one built here.
pub struct Database {
    buffer_pool: BufferPool,
    catalog: Catalog,
    config: Config,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Database::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        Database {
            buffer_pool: BufferPool::with_config(&config),
            catalog: Catalog::new(),
            config,
        }
    }

    pub fn get_buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn get_catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }
}
