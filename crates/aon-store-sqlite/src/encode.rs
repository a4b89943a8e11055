//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and load states as their
//! snake_case names. An ortholog's algorithm set is read back through
//! `GROUP_CONCAT` as a comma-separated id list.

use aon_core::{
  ortholog::Ortholog,
  version::{LoadState, Version},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── LoadState ───────────────────────────────────────────────────────────────

pub fn encode_state(state: LoadState) -> String { state.to_string() }

pub fn decode_state(s: &str) -> Result<LoadState> {
  s.parse()
    .map_err(|_| aon_core::Error::UnknownLoadState(s.to_owned()).into())
}

// ─── Algorithm sets ──────────────────────────────────────────────────────────

pub fn decode_alg_ids(s: Option<&str>) -> Result<Vec<i64>> {
  let Some(s) = s.filter(|s| !s.is_empty()) else {
    return Ok(Vec::new());
  };
  let mut ids = s
    .split(',')
    .map(|id| id.trim().parse::<i64>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|_| Error::AlgorithmList(s.to_owned()))?;
  ids.sort_unstable();
  Ok(ids)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a `schema_version` row.
pub struct RawVersion {
  pub id:            i64,
  pub schema_name:   String,
  pub release:       String,
  pub created_at:    String,
  pub state:         String,
  pub load_complete: bool,
}

impl RawVersion {
  pub const COLUMNS: &'static str =
    "id, schema_name, release, created_at, state, load_complete";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      schema_name:   row.get(1)?,
      release:       row.get(2)?,
      created_at:    row.get(3)?,
      state:         row.get(4)?,
      load_complete: row.get(5)?,
    })
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      id:            self.id,
      schema_name:   self.schema_name,
      release:       self.release,
      created_at:    decode_dt(&self.created_at)?,
      state:         decode_state(&self.state)?,
      load_complete: self.load_complete,
    })
  }
}

/// Raw columns of an `ort_ortholog` row joined with its algorithm ids.
pub struct RawOrtholog {
  pub ort_id:           i64,
  pub from_gene:        i64,
  pub to_gene:          i64,
  pub is_best:          bool,
  pub is_best_revised:  bool,
  pub is_best_adjusted: bool,
  pub num_algorithms:   i64,
  pub source_name:      String,
  pub algorithms:       Option<String>,
}

impl RawOrtholog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ort_id:           row.get(0)?,
      from_gene:        row.get(1)?,
      to_gene:          row.get(2)?,
      is_best:          row.get(3)?,
      is_best_revised:  row.get(4)?,
      is_best_adjusted: row.get(5)?,
      num_algorithms:   row.get(6)?,
      source_name:      row.get(7)?,
      algorithms:       row.get(8)?,
    })
  }

  pub fn into_ortholog(self) -> Result<Ortholog> {
    Ok(Ortholog {
      ort_id:           self.ort_id,
      from_gene:        self.from_gene,
      to_gene:          self.to_gene,
      is_best:          self.is_best,
      is_best_revised:  self.is_best_revised,
      is_best_adjusted: self.is_best_adjusted,
      num_algorithms:   self.num_algorithms,
      source_name:      self.source_name,
      algorithms:       decode_alg_ids(self.algorithms.as_deref())?,
    })
  }
}
