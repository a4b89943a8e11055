//! SQLite backend for the ortholog normalizer.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Provides the per-version data store,
//! the version registry, and a read-only view of the internal gene catalog.

mod catalog;
mod encode;
mod schema;
mod store;
mod versions;

pub mod error;

pub use catalog::SqliteCatalog;
pub use error::{Error, Result};
pub use store::SqliteStore;
pub use versions::SqliteVersions;

#[cfg(test)]
mod tests;
