//! Core types and trait definitions for the ortholog normalizer.
//!
//! This crate is free of HTTP and database dependencies. Identifier
//! normalisation and homology clustering live here as pure functions; every
//! other crate depends on it.

// Native `async fn` in traits; the returned futures are bounded `Send` in
// the trait signatures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod cluster;
pub mod error;
pub mod gene;
pub mod ortholog;
pub mod refid;
pub mod species;
pub mod store;
pub mod version;

pub use error::{Error, Result};
