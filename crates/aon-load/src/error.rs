//! Error type for the load pipeline.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("feed error: {0}")]
  Feed(#[from] aon_feed::Error),

  #[error("core error: {0}")]
  Core(#[from] aon_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal catalog error: {0}")]
  Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// An ortholog names a gene the gene pass never inserted.
  #[error("line {line}: gene {ref_id:?} is not loaded")]
  UnknownGene { line: usize, ref_id: String },

  #[error("line {line}: algorithm {name:?} is not loaded")]
  UnknownAlgorithm { line: usize, name: String },

  #[error("taxon {0} has no species row")]
  UnknownTaxon(i64),

  #[error("no version with id {0}")]
  UnknownVersion(aon_core::version::VersionId),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("release info: {0}")]
  ReleaseInfo(String),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("step {step} timed out after {after:?}")]
  StepTimedOut { step: &'static str, after: Duration },

  #[error("step {step} failed after {attempts} attempt(s): {source}")]
  StepFailed {
    step:     &'static str,
    attempts: u32,
    #[source]
    source:   Box<Error>,
  },

  #[error("load cancelled")]
  Cancelled,
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn catalog<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Catalog(Box::new(e))
  }

  /// Failures a later attempt may not hit again. Data errors are never
  /// transient.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      Self::Store(_)
        | Self::Catalog(_)
        | Self::Http(_)
        | Self::Io(_)
        | Self::ReleaseInfo(_)
        | Self::StepTimedOut { .. }
    )
  }

  /// The error that ended a failed step, past any retry wrapper.
  pub fn root(&self) -> &Error {
    match self {
      Self::StepFailed { source, .. } => source.root(),
      other => other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
