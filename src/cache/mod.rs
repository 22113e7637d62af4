//! Revalidation cache for content query results.
//!
//! Entries are keyed by query text and canonical parameters and carry the
//! instant they were fetched. Freshness is decided by the caller's
//! revalidation window, so the same entry can be fresh for one page and
//! stale for another.
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 512
//! revalidate_seconds = 60
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::QueryKey;
pub use store::{CachedResult, QueryCache};
