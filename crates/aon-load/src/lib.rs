//! Load pipeline for versioned ortholog releases.
//!
//! A [`Pipeline`] turns one external release into one complete version:
//! discover and fetch the release file, allocate a version, run the batch
//! loader, reconcile against the internal catalog, cluster, and finally mark
//! the version complete. Each step runs under its own timeout and retry
//! policy (see [`step`]).

#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod homology;
pub mod loader;
pub mod reconcile;
pub mod source;
pub mod step;
pub mod workflow;

pub use config::LoadConfig;
pub use error::{Error, Result};
pub use source::{AllianceSource, LocalSource, ReleaseSource};
pub use workflow::{LoadReport, Pipeline, RunOutcome};
