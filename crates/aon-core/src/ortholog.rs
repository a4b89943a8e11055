//! Pairwise ortholog calls and homology-cluster membership.
//!
//! Edges are stored directed but read as undirected: the same relationship may
//! appear once or twice depending on the feed.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  gene::{AlgorithmId, GeneId, SpeciesId},
};

pub type OrthologId = i64;
pub type ClusterId = i64;

/// Provenance name of every edge that came from the external release.
pub const FEED_SOURCE: &str = "AGR";

/// A stored ortholog call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ortholog {
  pub ort_id:           OrthologId,
  pub from_gene:        GeneId,
  pub to_gene:          GeneId,
  pub is_best:          bool,
  pub is_best_revised:  bool,
  /// Set when the best-call flag was `Yes_Adjusted` in the feed.
  pub is_best_adjusted: bool,
  pub num_algorithms:   i64,
  pub source_name:      String,
  /// Never empty.
  pub algorithms:       Vec<AlgorithmId>,
}

/// Input for a batched ortholog insert; gene and algorithm ids must already
/// exist in the target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrtholog {
  pub from_gene:        GeneId,
  pub to_gene:          GeneId,
  pub is_best:          bool,
  pub is_best_revised:  bool,
  pub is_best_adjusted: bool,
  pub num_algorithms:   i64,
  pub source_name:      String,
  pub algorithms:       Vec<AlgorithmId>,
}

impl NewOrtholog {
  /// Reject edges that would violate the non-empty algorithm set invariant.
  pub fn validate(&self) -> Result<()> {
    if self.algorithms.is_empty() {
      return Err(Error::EmptyAlgorithmSet {
        from_gene: self.from_gene,
        to_gene:   self.to_gene,
      });
    }
    Ok(())
  }
}

/// The projection of an [`Ortholog`] the clustering pass consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthologEdge {
  pub ort_id:      OrthologId,
  pub from_gene:   GeneId,
  pub to_gene:     GeneId,
  pub source_name: String,
}

/// Membership of a gene in a homology cluster. Identity is
/// `(hom_id, gn_id)`; there is no separate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homology {
  pub hom_id:      ClusterId,
  pub gn_id:       GeneId,
  pub sp_id:       SpeciesId,
  /// Source of the edge that last placed this gene into the cluster.
  pub source_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_algorithm_set_is_rejected() {
    let edge = NewOrtholog {
      from_gene:        1,
      to_gene:          2,
      is_best:          true,
      is_best_revised:  false,
      is_best_adjusted: false,
      num_algorithms:   0,
      source_name:      FEED_SOURCE.into(),
      algorithms:       vec![],
    };
    assert!(matches!(
      edge.validate(),
      Err(Error::EmptyAlgorithmSet { from_gene: 1, to_gene: 2 })
    ));

    let edge = NewOrtholog { algorithms: vec![7], ..edge };
    assert!(edge.validate().is_ok());
  }
}
