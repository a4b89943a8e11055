//! Error types for the release-file codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("file ended after {lines} lines, inside the preamble/header block")]
  TruncatedPreamble { lines: usize },

  #[error("line {line}: expected at least {expected} columns, found {found}")]
  MissingColumns {
    line:     usize,
    expected: usize,
    found:    usize,
  },

  #[error("line {line}: malformed taxon id {value:?}")]
  InvalidTaxon { line: usize, value: String },

  #[error("line {line}: malformed algorithm count {value:?}")]
  InvalidCount { line: usize, value: String },

  #[error("line {line}, column {column}: {value:?} is not one of Yes, No, Yes_Adjusted")]
  InvalidBestCall {
    line:   usize,
    column: usize,
    value:  String,
  },

  #[error("line {line}: empty gene reference id")]
  EmptyGeneRef { line: usize },

  #[error("line {line}: no algorithm listed")]
  EmptyAlgorithms { line: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
