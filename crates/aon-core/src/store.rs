//! Storage traits and the query types of the read-only data-access surface.
//!
//! Backends (e.g. `aon-store-sqlite`) implement these; the pipeline in
//! `aon-load` depends only on the abstraction.

use std::future::Future;

use crate::{
  gene::{Algorithm, AlgorithmId, Gene, GeneId, NewGene, NewSpecies, Species, SpeciesId},
  ortholog::{ClusterId, Homology, NewOrtholog, Ortholog, OrthologEdge},
  version::{LoadState, Version, VersionId},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Paging shared by every list query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
  pub limit:  Option<u64>,
  pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesQuery {
  pub name:     Option<String>,
  pub taxon_id: Option<i64>,
  pub page:     Page,
}

#[derive(Debug, Clone, Default)]
pub struct GeneQuery {
  pub ref_id: Option<String>,
  pub prefix: Option<String>,
  pub sp_id:  Option<SpeciesId>,
  pub page:   Page,
}

#[derive(Debug, Clone, Default)]
pub struct OrthologQuery {
  pub from_gene:       Option<GeneId>,
  pub to_gene:         Option<GeneId>,
  pub source_name:     Option<String>,
  pub is_best:         Option<bool>,
  pub is_best_revised: Option<bool>,
  /// Only edges whose algorithm set contains this algorithm.
  pub algorithm:       Option<AlgorithmId>,
  pub page:            Page,
}

#[derive(Debug, Clone, Default)]
pub struct HomologyQuery {
  pub hom_id:      Option<ClusterId>,
  pub gn_id:       Option<GeneId>,
  pub sp_id:       Option<SpeciesId>,
  pub source_name: Option<String>,
  pub page:        Page,
}

// ─── Data access ─────────────────────────────────────────────────────────────

/// Read access to one version's tables.
pub trait OrthologStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_species(
    &self,
    query: SpeciesQuery,
  ) -> impl Future<Output = Result<Vec<Species>, Self::Error>> + Send + '_;

  fn get_species(
    &self,
    id: SpeciesId,
  ) -> impl Future<Output = Result<Option<Species>, Self::Error>> + Send + '_;

  fn list_genes(
    &self,
    query: GeneQuery,
  ) -> impl Future<Output = Result<Vec<Gene>, Self::Error>> + Send + '_;

  fn get_gene(
    &self,
    id: GeneId,
  ) -> impl Future<Output = Result<Option<Gene>, Self::Error>> + Send + '_;

  /// Look a gene up by its external reference id.
  fn find_gene(
    &self,
    ref_id: String,
  ) -> impl Future<Output = Result<Option<Gene>, Self::Error>> + Send + '_;

  fn list_algorithms(
    &self,
  ) -> impl Future<Output = Result<Vec<Algorithm>, Self::Error>> + Send + '_;

  fn find_algorithm(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Algorithm>, Self::Error>> + Send + '_;

  fn list_orthologs(
    &self,
    query: OrthologQuery,
  ) -> impl Future<Output = Result<Vec<Ortholog>, Self::Error>> + Send + '_;

  /// Every ortholog edge, ordered by ortholog id.
  fn ortholog_edges(
    &self,
  ) -> impl Future<Output = Result<Vec<OrthologEdge>, Self::Error>> + Send + '_;

  fn list_homology(
    &self,
    query: HomologyQuery,
  ) -> impl Future<Output = Result<Vec<Homology>, Self::Error>> + Send + '_;

  /// Distinct provenance names present in the homology table.
  fn homology_sources(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}

/// Append-only writes used while a version is loading.
pub trait OrthologWriter: OrthologStore {
  /// Insert species whose taxon is not yet present; returns the number added.
  fn insert_species(
    &self,
    species: Vec<NewSpecies>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert algorithms by name, skipping names already present.
  fn insert_algorithms(
    &self,
    names: Vec<String>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert genes, skipping reference ids already present.
  fn insert_genes(
    &self,
    genes: Vec<NewGene>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert a batch of orthologs with their algorithm sets in a single
  /// transaction. Either the whole batch commits or none of it does.
  fn insert_ortholog_batch(
    &self,
    batch: Vec<NewOrtholog>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete every ortholog with the given provenance.
  fn delete_orthologs(
    &self,
    source_name: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace the whole homology table in one transaction.
  fn replace_homology(
    &self,
    rows: Vec<Homology>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Versions ────────────────────────────────────────────────────────────────

/// The versioned schema manager.
pub trait VersionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Data: OrthologWriter<Error = Self::Error> + Clone + 'static;

  /// Allocate an isolated schema for `release`. Fails if a version for the
  /// same release already exists.
  fn create_version(
    &self,
    release: String,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  fn get_version(
    &self,
    id: VersionId,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// The version created for `release`, complete or not.
  fn find_release(
    &self,
    release: String,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// Complete versions only, newest first.
  fn list_complete_versions(
    &self,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  /// Record that a load step succeeded. The transition must be a single
  /// step and may not reach [`LoadState::Complete`].
  fn record_state(
    &self,
    id: VersionId,
    state: LoadState,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  /// Flip the completion flag. Only valid from
  /// [`LoadState::HomologyComputed`].
  fn mark_complete(
    &self,
    id: VersionId,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  /// The version readers get when they do not ask for one.
  fn default_version(
    &self,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// Open an incomplete version's tables for loading.
  fn open_version(
    &self,
    id: VersionId,
  ) -> impl Future<Output = Result<Self::Data, Self::Error>> + Send + '_;

  /// Open a complete version for reading: `Some(id)` must name a complete
  /// version, `None` resolves the default.
  fn open_complete(
    &self,
    id: Option<VersionId>,
  ) -> impl Future<Output = Result<(Version, Self::Data), Self::Error>> + Send + '_;
}
