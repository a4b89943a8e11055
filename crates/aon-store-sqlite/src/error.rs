//! Error type for `aon-store-sqlite`.

use aon_core::version::VersionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] aon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("malformed algorithm list: {0:?}")]
  AlgorithmList(String),

  #[error("version not found: {0}")]
  VersionNotFound(VersionId),

  #[error("a version for release {0:?} already exists")]
  ReleaseExists(String),

  #[error("version {0} has not finished loading")]
  VersionIncomplete(VersionId),

  #[error("no complete version is available")]
  NoCompleteVersion,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
