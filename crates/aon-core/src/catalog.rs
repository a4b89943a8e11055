//! Read-only access to the internal gene catalog.
//!
//! Only cross-catalog reconciliation reads it; nothing in this workspace
//! writes to it. Ids here belong to the internal catalog and never mix with
//! the ids of a loaded version.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::refid::SourceDb;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSpecies {
  pub sp_id:    i64,
  pub name:     String,
  pub taxon_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneDatabase {
  pub gdb_id: i64,
  pub name:   String,
}

impl GeneDatabase {
  /// The recognised source database, or `None` for databases (variants,
  /// probes, ...) that have no reference-id convention.
  pub fn source(&self) -> Option<SourceDb> { self.name.parse().ok() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGene {
  pub ode_gene_id: i64,
  /// Reference id in the internal (unprefixed) form.
  pub ref_id:      String,
  pub gdb_id:      i64,
  pub sp_id:       i64,
}

/// One row of the internal catalog's own homology clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogHomolog {
  pub hom_id:      i64,
  pub ode_gene_id: i64,
  pub sp_id:       i64,
}

pub trait InternalCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn species(
    &self,
  ) -> impl Future<Output = Result<Vec<CatalogSpecies>, Self::Error>> + Send + '_;

  fn gene_databases(
    &self,
  ) -> impl Future<Output = Result<Vec<GeneDatabase>, Self::Error>> + Send + '_;

  /// Every gene of the given species, across all gene databases.
  fn genes_for_species(
    &self,
    sp_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<CatalogGene>, Self::Error>> + Send + '_;

  /// Every gene row (one per gene database) for the given gene ids.
  fn genes_by_id(
    &self,
    ode_gene_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<CatalogGene>, Self::Error>> + Send + '_;

  /// All members of every cluster that contains at least one of the given
  /// genes, ordered by cluster id.
  fn homology_for_genes(
    &self,
    ode_gene_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<CatalogHomolog>, Self::Error>> + Send + '_;
}
