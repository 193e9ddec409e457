//! Tunable constants for the storage core, with optional environment overrides.
//!
//! Defaults are compile-time constants; [`Config::from_env`] layers
//! `RUSTYDB_*` environment variables on top of them via the `config` crate.
//! Tests that need a non-default page size construct a [`Config`] directly
//! instead of mutating global state.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 100;
pub const DEFAULT_STRING_FIELD_CAPACITY: usize = 128;
pub const DEFAULT_IO_COST_PER_PAGE: f64 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub page_size: usize,
    pub buffer_pool_pages: usize,
    pub histogram_buckets: usize,
    pub string_field_capacity: usize,
    pub io_cost_per_page: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            string_field_capacity: DEFAULT_STRING_FIELD_CAPACITY,
            io_cost_per_page: DEFAULT_IO_COST_PER_PAGE,
        }
    }
}

impl Config {
    /// Builds a `Config` from compile-time defaults overridden by any
    /// `RUSTYDB_*` environment variables present (e.g. `RUSTYDB_PAGE_SIZE`).
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let built = config::Config::builder()
            .set_default("page_size", defaults.page_size as i64)
            .and_then(|b| b.set_default("buffer_pool_pages", defaults.buffer_pool_pages as i64))
            .and_then(|b| b.set_default("histogram_buckets", defaults.histogram_buckets as i64))
            .and_then(|b| {
                b.set_default(
                    "string_field_capacity",
                    defaults.string_field_capacity as i64,
                )
            })
            .and_then(|b| b.set_default("io_cost_per_page", defaults.io_cost_per_page))
            .and_then(|b| b.add_source(config::Environment::with_prefix("RUSTYDB")).build());

        match built.and_then(|c| c.try_deserialize::<Config>()) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("failed to load RUSTYDB_* environment config, using defaults: {e}");
                defaults
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.buffer_pool_pages, DEFAULT_BUFFER_POOL_PAGES);
        assert_eq!(cfg.histogram_buckets, DEFAULT_HISTOGRAM_BUCKETS);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        let cfg = Config::from_env();
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
    }
}
