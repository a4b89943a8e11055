//! [`SqliteVersions`]: the versioned schema manager.
//!
//! A registry database records every version. Each version's tables live in
//! their own database (`{schema_name}.sqlite` under the store root), so a
//! reload never touches a previous version's data and an abandoned load can
//! be discarded by deleting one file.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use aon_core::{
  store::VersionStore,
  version::{LoadState, Version, VersionId, schema_name_for},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
  Error, Result,
  encode::{RawVersion, encode_dt, encode_state},
  schema::REGISTRY_SCHEMA,
  store::SqliteStore,
};

const REGISTRY_FILE: &str = "registry.sqlite";

#[derive(Clone)]
enum Location {
  Directory(PathBuf),
  /// Test mode: every version lives in its own in-memory database.
  Memory(Arc<Mutex<HashMap<VersionId, SqliteStore>>>),
}

/// Registry of versions plus access to each version's [`SqliteStore`].
#[derive(Clone)]
pub struct SqliteVersions {
  registry:       tokio_rusqlite::Connection,
  location:       Location,
  default_schema: Option<String>,
}

impl SqliteVersions {
  /// Open (or create) a store root directory.
  pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref().to_path_buf();
    std::fs::create_dir_all(&root)?;
    let registry = tokio_rusqlite::Connection::open(root.join(REGISTRY_FILE)).await?;
    Self::init(registry, Location::Directory(root)).await
  }

  /// A registry and versions that live only in memory.
  pub async fn open_in_memory() -> Result<Self> {
    let registry = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(registry, Location::Memory(Arc::default())).await
  }

  async fn init(registry: tokio_rusqlite::Connection, location: Location) -> Result<Self> {
    registry
      .call(|conn| {
        conn.execute_batch(REGISTRY_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { registry, location, default_schema: None })
  }

  /// Prefer the version with this schema name as the default, when it is
  /// complete.
  pub fn with_default_schema(mut self, schema_name: Option<String>) -> Self {
    self.default_schema = schema_name;
    self
  }

  /// Every version, complete or not, newest first.
  pub async fn list_versions(&self) -> Result<Vec<Version>> {
    self.select_versions(false).await
  }

  async fn select_versions(&self, complete_only: bool) -> Result<Vec<Version>> {
    let raws: Vec<RawVersion> = self
      .registry
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM schema_version
           WHERE (?1 = 0 OR load_complete = 1)
           ORDER BY created_at DESC, id DESC",
          RawVersion::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![complete_only], RawVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVersion::into_version).collect()
  }

  async fn select_version(&self, column: &'static str, value: String) -> Result<Option<Version>> {
    let raw: Option<RawVersion> = self
      .registry
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM schema_version WHERE {column} = ?1",
          RawVersion::COLUMNS
        );
        let row = conn
          .query_row(&sql, rusqlite::params![value], RawVersion::from_row)
          .optional()?;
        Ok(row)
      })
      .await?;
    raw.map(RawVersion::into_version).transpose()
  }

  async fn require(&self, id: VersionId) -> Result<Version> {
    self.get_version(id).await?.ok_or(Error::VersionNotFound(id))
  }

  async fn write_state(&self, id: VersionId, state: LoadState) -> Result<Version> {
    let state_str = encode_state(state);
    let complete = state.is_complete();
    self
      .registry
      .call(move |conn| {
        conn.execute(
          "UPDATE schema_version SET state = ?2, load_complete = ?3 WHERE id = ?1",
          rusqlite::params![id, state_str, complete],
        )?;
        Ok(())
      })
      .await?;
    self.require(id).await
  }

  async fn store_for(&self, version: &Version) -> Result<SqliteStore> {
    match &self.location {
      Location::Directory(root) => {
        SqliteStore::open(root.join(format!("{}.sqlite", version.schema_name))).await
      }
      Location::Memory(stores) => {
        let mut stores = stores.lock().await;
        if let Some(store) = stores.get(&version.id) {
          return Ok(store.clone());
        }
        let store = SqliteStore::open_in_memory().await?;
        stores.insert(version.id, store.clone());
        Ok(store)
      }
    }
  }
}

// ─── VersionStore impl ───────────────────────────────────────────────────────

impl VersionStore for SqliteVersions {
  type Data = SqliteStore;
  type Error = Error;

  async fn create_version(&self, release: String) -> Result<Version> {
    let schema_name = schema_name_for(&release);
    let created_at = encode_dt(Utc::now());
    let state = encode_state(LoadState::Created);

    let id: Option<VersionId> = {
      let release = release.clone();
      self
        .registry
        .call(move |conn| {
          let tx = conn.transaction()?;
          let taken = tx
            .query_row(
              "SELECT id FROM schema_version WHERE release = ?1 OR schema_name = ?2",
              rusqlite::params![release, schema_name],
              |r| r.get::<_, i64>(0),
            )
            .optional()?;
          if taken.is_some() {
            return Ok(None);
          }
          tx.execute(
            "INSERT INTO schema_version (schema_name, release, created_at, state)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![schema_name, release, created_at, state],
          )?;
          let id = tx.last_insert_rowid();
          tx.commit()?;
          Ok(Some(id))
        })
        .await?
    };

    let id = id.ok_or_else(|| Error::ReleaseExists(release.clone()))?;
    let version = self.require(id).await?;
    self.store_for(&version).await?;
    info!(version_id = id, %release, schema = %version.schema_name, "version created");
    Ok(version)
  }

  async fn get_version(&self, id: VersionId) -> Result<Option<Version>> {
    let raw: Option<RawVersion> = self
      .registry
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM schema_version WHERE id = ?1",
          RawVersion::COLUMNS
        );
        let row = conn
          .query_row(&sql, rusqlite::params![id], RawVersion::from_row)
          .optional()?;
        Ok(row)
      })
      .await?;
    raw.map(RawVersion::into_version).transpose()
  }

  async fn find_release(&self, release: String) -> Result<Option<Version>> {
    self.select_version("release", release).await
  }

  async fn list_complete_versions(&self) -> Result<Vec<Version>> {
    self.select_versions(true).await
  }

  async fn record_state(&self, id: VersionId, state: LoadState) -> Result<Version> {
    let version = self.require(id).await?;
    version.ensure_writable()?;
    if state.is_complete() {
      return Err(
        aon_core::Error::InvalidTransition { from: version.state, to: state }.into(),
      );
    }
    version.state.advance(state)?;
    self.write_state(id, state).await
  }

  async fn mark_complete(&self, id: VersionId) -> Result<Version> {
    let version = self.require(id).await?;
    version.ensure_writable()?;
    version.state.advance(LoadState::Complete)?;
    let version = self.write_state(id, LoadState::Complete).await?;
    info!(version_id = id, release = %version.release, "version marked complete");
    Ok(version)
  }

  async fn default_version(&self) -> Result<Option<Version>> {
    let complete = self.list_complete_versions().await?;
    if let Some(name) = &self.default_schema
      && let Some(preferred) = complete.iter().find(|v| &v.schema_name == name)
    {
      return Ok(Some(preferred.clone()));
    }
    Ok(complete.into_iter().next())
  }

  async fn open_version(&self, id: VersionId) -> Result<SqliteStore> {
    let version = self.require(id).await?;
    version.ensure_writable()?;
    self.store_for(&version).await
  }

  async fn open_complete(&self, id: Option<VersionId>) -> Result<(Version, SqliteStore)> {
    let version = match id {
      Some(id) => {
        let version = self.require(id).await?;
        if !version.load_complete {
          return Err(Error::VersionIncomplete(id));
        }
        version
      }
      None => self.default_version().await?.ok_or(Error::NoCompleteVersion)?,
    };
    let store = self.store_for(&version).await?;
    Ok((version, store))
  }
}
