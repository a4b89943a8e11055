//! Species, genes, and the ortholog-calling algorithms that relate them.
//!
//! All three are created once per load and never mutated afterwards.

use serde::{Deserialize, Serialize};

pub type SpeciesId = i64;
pub type GeneId = i64;
pub type AlgorithmId = i64;

/// A species as known to the external feed.
///
/// `name` is the join key against the internal catalog and is compared
/// case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
  pub sp_id:    SpeciesId,
  pub name:     String,
  pub taxon_id: i64,
}

/// Input for [`OrthologWriter::insert_species`](crate::store::OrthologWriter::insert_species).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewSpecies {
  pub name:     String,
  pub taxon_id: i64,
}

/// A gene, identified by its external (prefixed) reference id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
  pub gn_id:  GeneId,
  /// Unique within a version, e.g. `WB:WBGene00000001` or `RGD:620664`.
  pub ref_id: String,
  /// Source-database tag; for feed genes the text before the first `:`.
  pub prefix: String,
  pub sp_id:  SpeciesId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGene {
  pub ref_id: String,
  pub prefix: String,
  pub sp_id:  SpeciesId,
}

/// An ortholog-calling method reported by the feed (e.g. `PANTHER`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
  pub alg_id: AlgorithmId,
  pub name:   String,
}
