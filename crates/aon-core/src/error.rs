//! Error types for `aon-core`.

use thiserror::Error;

use crate::version::{LoadState, VersionId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot move a load from {from} to {to}")]
  InvalidTransition { from: LoadState, to: LoadState },

  #[error("version {0} is already complete")]
  VersionComplete(VersionId),

  #[error("unknown load state: {0:?}")]
  UnknownLoadState(String),

  #[error("ortholog {from_gene} -> {to_gene} has no supporting algorithm")]
  EmptyAlgorithmSet { from_gene: i64, to_gene: i64 },

  #[error("gene {0} has no recorded species")]
  GeneWithoutSpecies(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
