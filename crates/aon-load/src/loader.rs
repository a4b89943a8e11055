//! The three-pass batch loader.
//!
//! 1. species and algorithms named anywhere in the file;
//! 2. every gene, keyed by reference id;
//! 3. ortholog rows in fixed-size batches, one transaction each.
//!
//! Passes 1 and 2 must commit before pass 3 starts: every ortholog resolves
//! its genes and algorithms against rows already in the store.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use aon_core::{
  gene::{AlgorithmId, GeneId, NewGene},
  ortholog::{FEED_SOURCE, NewOrtholog},
  store::{GeneQuery, OrthologWriter, SpeciesQuery},
};
use aon_feed::{FeedReader, FeedRow, Inventory, collect_genes};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
  pub batch_size:  usize,
  /// Stop after this many batches; the rest of the file is left unread.
  pub max_batches: Option<usize>,
}

impl Default for BatchOptions {
  fn default() -> Self { Self { batch_size: 10_000, max_batches: None } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeciesLoad {
  pub species:    u64,
  pub algorithms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrthologLoad {
  pub batches:   usize,
  pub orthologs: u64,
  /// Leftover feed edges from an interrupted attempt, removed first.
  pub cleared:   u64,
}

async fn blocking<T, F>(f: F) -> Result<T>
where
  F: FnOnce() -> Result<T> + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(f).await?
}

// ─── Pass 1 ──────────────────────────────────────────────────────────────────

pub async fn load_species<W: OrthologWriter>(store: &W, feed: &Path) -> Result<SpeciesLoad> {
  let path = feed.to_path_buf();
  let inventory =
    blocking(move || Ok(Inventory::collect(FeedReader::open(&path)?)?)).await?;

  let species = store
    .insert_species(inventory.new_species())
    .await
    .map_err(Error::store)?;
  let algorithms = store
    .insert_algorithms(inventory.algorithms.into_iter().collect())
    .await
    .map_err(Error::store)?;

  info!(
    species,
    algorithms,
    taxa = inventory.species.len(),
    "species and algorithms loaded"
  );
  Ok(SpeciesLoad { species, algorithms })
}

// ─── Pass 2 ──────────────────────────────────────────────────────────────────

pub async fn load_genes<W: OrthologWriter>(
  store: &W,
  feed: &Path,
  batch_size: usize,
) -> Result<u64> {
  let path = feed.to_path_buf();
  let genes = blocking(move || Ok(collect_genes(FeedReader::open(&path)?)?)).await?;

  let species_by_taxon: HashMap<i64, i64> = store
    .list_species(SpeciesQuery::default())
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|s| (s.taxon_id, s.sp_id))
    .collect();

  let mut rows = Vec::with_capacity(genes.len());
  for (ref_id, entry) in genes {
    let sp_id = *species_by_taxon
      .get(&entry.taxon_id)
      .ok_or(Error::UnknownTaxon(entry.taxon_id))?;
    rows.push(NewGene { ref_id, prefix: entry.prefix, sp_id });
  }

  let mut inserted = 0;
  let total = rows.len();
  let mut rows = rows.into_iter().peekable();
  while rows.peek().is_some() {
    let chunk: Vec<NewGene> = rows.by_ref().take(batch_size.max(1)).collect();
    inserted += store.insert_genes(chunk).await.map_err(Error::store)?;
  }

  info!(inserted, distinct = total, "genes loaded");
  Ok(inserted)
}

// ─── Pass 3 ──────────────────────────────────────────────────────────────────

/// Reference id → gene id and algorithm name → id for one version.
pub struct Lookup {
  genes:      HashMap<String, GeneId>,
  algorithms: HashMap<String, AlgorithmId>,
}

impl Lookup {
  pub async fn read<W: OrthologWriter>(store: &W) -> Result<Self> {
    let genes = store
      .list_genes(GeneQuery::default())
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|g| (g.ref_id, g.gn_id))
      .collect();
    let algorithms = store
      .list_algorithms()
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|a| (a.name, a.alg_id))
      .collect();
    Ok(Self { genes, algorithms })
  }

  fn gene(&self, line: usize, ref_id: &str) -> Result<GeneId> {
    self
      .genes
      .get(ref_id)
      .copied()
      .ok_or_else(|| Error::UnknownGene { line, ref_id: ref_id.to_owned() })
  }

  fn algorithm(&self, line: usize, name: &str) -> Result<AlgorithmId> {
    self
      .algorithms
      .get(name)
      .copied()
      .ok_or_else(|| Error::UnknownAlgorithm { line, name: name.to_owned() })
  }

  /// Resolve a feed row into an insertable ortholog. A reference the earlier
  /// passes did not load is an error, never a skip.
  pub fn resolve(&self, row: &FeedRow) -> Result<NewOrtholog> {
    let mut algorithms = row
      .algorithms
      .iter()
      .map(|name| self.algorithm(row.line, name))
      .collect::<Result<Vec<_>>>()?;
    algorithms.sort_unstable();
    algorithms.dedup();

    Ok(NewOrtholog {
      from_gene: self.gene(row.line, &row.from.ref_id)?,
      to_gene: self.gene(row.line, &row.to.ref_id)?,
      is_best: row.best.is_best(),
      is_best_revised: row.best_revised.is_best(),
      is_best_adjusted: row.best.is_adjusted(),
      num_algorithms: row.num_algorithms,
      source_name: FEED_SOURCE.to_owned(),
      algorithms,
    })
  }
}

/// Read batches on a blocking thread and hand them over a bounded channel.
/// Dropping the receiver stops the reader at its next send.
fn spawn_reader(path: PathBuf, batch_size: usize) -> mpsc::Receiver<Result<Vec<FeedRow>>> {
  let (tx, rx) = mpsc::channel(2);
  tokio::task::spawn_blocking(move || {
    let rows = match FeedReader::open(&path) {
      Ok(rows) => rows,
      Err(e) => {
        let _ = tx.blocking_send(Err(e.into()));
        return;
      }
    };
    for batch in rows.batches(batch_size) {
      let stop = batch.is_err();
      if tx.blocking_send(batch.map_err(Error::from)).is_err() || stop {
        return;
      }
    }
  });
  rx
}

pub async fn load_orthologs<W: OrthologWriter>(
  store: &W,
  feed: &Path,
  options: BatchOptions,
) -> Result<OrthologLoad> {
  let cleared = store
    .delete_orthologs(FEED_SOURCE.to_owned())
    .await
    .map_err(Error::store)?;
  if cleared > 0 {
    warn!(cleared, "removed feed orthologs left by an earlier attempt");
  }

  let lookup = Lookup::read(store).await?;
  let mut batches = spawn_reader(feed.to_path_buf(), options.batch_size);

  let mut load = OrthologLoad { cleared, ..OrthologLoad::default() };
  while let Some(batch) = batches.recv().await {
    if options.max_batches.is_some_and(|max| load.batches >= max) {
      info!(batches = load.batches, "batch limit reached");
      break;
    }
    let rows = batch?;
    let first_line = rows.first().map(|r| r.line);
    let orthologs = rows
      .iter()
      .map(|row| lookup.resolve(row))
      .collect::<Result<Vec<_>>>()?;

    load.orthologs += store
      .insert_ortholog_batch(orthologs)
      .await
      .map_err(Error::store)?;
    load.batches += 1;
    debug!(batch = load.batches, ?first_line, rows = rows.len(), "batch committed");
  }

  info!(batches = load.batches, orthologs = load.orthologs, "orthologs loaded");
  Ok(load)
}
