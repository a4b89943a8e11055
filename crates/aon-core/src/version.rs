//! Versions, each one isolated named data load, and the load state machine
//! they move through.
//!
//! A version is created incomplete, advances one step at a time, and is
//! flipped to complete only from [`LoadState::HomologyComputed`]. A failed
//! load stays at its last successful state and is never selected as default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

pub type VersionId = i64;

// ─── State machine ───────────────────────────────────────────────────────────

/// Progress of a load, in the order steps must succeed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadState {
  Created,
  SpeciesLoaded,
  GenesLoaded,
  OrthologsLoaded,
  Reconciled,
  HomologyComputed,
  Complete,
}

impl LoadState {
  /// The state a successful next step moves to; `None` once complete.
  pub fn next(self) -> Option<Self> {
    match self {
      Self::Created => Some(Self::SpeciesLoaded),
      Self::SpeciesLoaded => Some(Self::GenesLoaded),
      Self::GenesLoaded => Some(Self::OrthologsLoaded),
      Self::OrthologsLoaded => Some(Self::Reconciled),
      Self::Reconciled => Some(Self::HomologyComputed),
      Self::HomologyComputed => Some(Self::Complete),
      Self::Complete => None,
    }
  }

  /// Validate a single-step transition from `self` to `to`.
  pub fn advance(self, to: Self) -> Result<Self> {
    if self.next() == Some(to) {
      Ok(to)
    } else {
      Err(Error::InvalidTransition { from: self, to })
    }
  }

  pub fn is_complete(self) -> bool { matches!(self, Self::Complete) }
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// One complete, isolated data load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  pub id:            VersionId,
  /// Name of the isolated schema instance holding this load's tables.
  pub schema_name:   String,
  /// Release tag of the external feed this load came from.
  pub release:       String,
  pub created_at:    DateTime<Utc>,
  pub state:         LoadState,
  pub load_complete: bool,
}

impl Version {
  /// Fail unless the version may still be written to.
  pub fn ensure_writable(&self) -> Result<()> {
    if self.load_complete {
      return Err(Error::VersionComplete(self.id));
    }
    Ok(())
  }
}

/// Schema name for a release tag: `aon_` plus the tag with every
/// non-alphanumeric character replaced by `_`.
pub fn schema_name_for(release: &str) -> String {
  let tag: String = release
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
    .collect();
  format!("aon_{tag}")
}
