//! Cross-catalog reconciliation.
//!
//! Species the internal catalog knows but the release never mentions are
//! added to the version, along with their genes. Each of those genes is then
//! paired with every member of its internal homology clusters that the
//! version already holds, producing synthesized ortholog edges under the
//! configured provenance name.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use aon_core::{
  catalog::{CatalogHomolog, CatalogSpecies, InternalCatalog},
  gene::{GeneId, NewGene, NewSpecies, SpeciesId},
  ortholog::{FEED_SOURCE, NewOrtholog},
  refid::{SourceDb, to_external},
  species::SpeciesMap,
  store::{GeneQuery, OrthologWriter, SpeciesQuery},
};
use tracing::{debug, info, warn};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileLoad {
  pub species: u64,
  pub genes:   u64,
  pub edges:   u64,
  /// Synthesized edges from an earlier attempt, removed first.
  pub cleared: u64,
}

/// Symbols and placeholders are not unique across species.
fn is_stable(db: SourceDb) -> bool { !matches!(db, SourceDb::GeneSymbol | SourceDb::Unannotated) }

async fn gene_ids<W: OrthologWriter>(store: &W) -> Result<HashMap<String, (GeneId, SpeciesId)>> {
  Ok(
    store
      .list_genes(GeneQuery::default())
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|g| (g.ref_id, (g.gn_id, g.sp_id)))
      .collect(),
  )
}

/// Species with at least one gene on a feed edge.
async fn feed_species<W: OrthologWriter>(
  store: &W,
  genes: &HashMap<String, (GeneId, SpeciesId)>,
) -> Result<HashSet<SpeciesId>> {
  let species_of: HashMap<GeneId, SpeciesId> = genes.values().copied().collect();
  Ok(
    store
      .ortholog_edges()
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|e| e.source_name == FEED_SOURCE)
      .flat_map(|e| [e.from_gene, e.to_gene])
      .filter_map(|g| species_of.get(&g).copied())
      .collect(),
  )
}

pub async fn reconcile<W, C>(
  store: &W,
  catalog: &C,
  source_name: &str,
  batch_size: usize,
) -> Result<ReconcileLoad>
where
  W: OrthologWriter,
  C: InternalCatalog,
{
  let mut load = ReconcileLoad {
    cleared: store
      .delete_orthologs(source_name.to_owned())
      .await
      .map_err(Error::store)?,
    ..ReconcileLoad::default()
  };

  let catalog_species = catalog.species().await.map_err(Error::catalog)?;
  let genes = gene_ids(store).await?;
  let in_feed = feed_species(store, &genes).await?;

  let by_name: HashMap<String, SpeciesId> = store
    .list_species(SpeciesQuery::default())
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|s| (s.name, s.sp_id))
    .collect();
  let missing: Vec<&CatalogSpecies> = catalog_species
    .iter()
    .filter(|s| by_name.get(&s.name).is_none_or(|id| !in_feed.contains(id)))
    .collect();
  if missing.is_empty() {
    info!("every catalog species is already in the release");
    return Ok(load);
  }

  // ─── Species ───────────────────────────────────────────────────────────────

  load.species = store
    .insert_species(
      missing
        .iter()
        .filter(|s| !by_name.contains_key(&s.name))
        .map(|s| NewSpecies { name: s.name.clone(), taxon_id: s.taxon_id })
        .collect(),
    )
    .await
    .map_err(Error::store)?;

  let species_map = SpeciesMap::new(
    catalog_species.iter().map(|s| (s.sp_id, s.name.clone())),
    store
      .list_species(SpeciesQuery::default())
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|s| (s.sp_id, s.name)),
  );
  let mut targets: HashMap<i64, SpeciesId> = HashMap::new();
  for species in &missing {
    match species_map.to_external_species(species.sp_id) {
      Some(sp_id) => {
        targets.insert(species.sp_id, sp_id);
      }
      None => warn!(
        species = %species.name,
        taxon_id = species.taxon_id,
        "taxon already loaded under another name, skipping"
      ),
    }
  }

  if targets.is_empty() {
    return Ok(load);
  }

  // ─── Genes ─────────────────────────────────────────────────────────────────

  let databases: HashMap<i64, SourceDb> = catalog
    .gene_databases()
    .await
    .map_err(Error::catalog)?
    .into_iter()
    .filter_map(|db| Some((db.gdb_id, db.source()?)))
    .collect();

  // One representative reference per catalog gene: the lowest stable
  // database id.
  let mut imports: BTreeMap<i64, NewGene> = BTreeMap::new();
  for gene in catalog
    .genes_for_species(targets.keys().copied().collect())
    .await
    .map_err(Error::catalog)?
  {
    let (Some(&db), Some(&sp_id)) = (databases.get(&gene.gdb_id), targets.get(&gene.sp_id))
    else {
      continue;
    };
    if !is_stable(db) || imports.contains_key(&gene.ode_gene_id) {
      continue;
    }
    imports.insert(gene.ode_gene_id, NewGene {
      ref_id: to_external(&gene.ref_id, Some(db)),
      prefix: db.prefix().to_owned(),
      sp_id,
    });
  }

  let rows: Vec<NewGene> = imports.values().cloned().collect();
  for chunk in rows.chunks(batch_size.max(1)) {
    load.genes += store.insert_genes(chunk.to_vec()).await.map_err(Error::store)?;
  }

  let genes = gene_ids(store).await?;
  let mut new_members: HashMap<i64, GeneId> = HashMap::new();
  for (&ode_gene_id, gene) in &imports {
    let Some(&(gn_id, sp_id)) = genes.get(&gene.ref_id) else { continue };
    if sp_id != gene.sp_id {
      warn!(
        ode_gene_id,
        ref_id = %gene.ref_id,
        "reference already held by a gene of another species, skipping"
      );
      continue;
    }
    new_members.insert(ode_gene_id, gn_id);
  }

  // ─── Clusters ──────────────────────────────────────────────────────────────

  let mut clusters: BTreeMap<i64, Vec<CatalogHomolog>> = BTreeMap::new();
  for member in catalog
    .homology_for_genes(new_members.keys().copied().collect())
    .await
    .map_err(Error::catalog)?
  {
    clusters.entry(member.hom_id).or_default().push(member);
  }

  let foreign_ids: BTreeSet<i64> = clusters
    .values()
    .flatten()
    .filter(|m| !targets.contains_key(&m.sp_id))
    .map(|m| m.ode_gene_id)
    .collect();
  let mut foreign: HashMap<i64, GeneId> = HashMap::new();
  for gene in catalog
    .genes_by_id(foreign_ids.into_iter().collect())
    .await
    .map_err(Error::catalog)?
  {
    if foreign.contains_key(&gene.ode_gene_id) {
      continue;
    }
    let Some(&db) = databases.get(&gene.gdb_id) else { continue };
    if let Some(&(gn_id, _)) = genes.get(&to_external(&gene.ref_id, Some(db))) {
      foreign.insert(gene.ode_gene_id, gn_id);
    }
  }

  let mut pairs: BTreeSet<(GeneId, GeneId)> = BTreeSet::new();
  for (hom_id, members) in &clusters {
    let news: Vec<GeneId> =
      members.iter().filter_map(|m| new_members.get(&m.ode_gene_id).copied()).collect();
    let matched: Vec<GeneId> =
      members.iter().filter_map(|m| foreign.get(&m.ode_gene_id).copied()).collect();
    if matched.is_empty() {
      debug!(hom_id, "cluster has no loaded member");
      continue;
    }
    for &from in &news {
      for &to in &matched {
        pairs.insert((from, to));
      }
    }
  }

  // ─── Edges ─────────────────────────────────────────────────────────────────

  store
    .insert_algorithms(vec![source_name.to_owned()])
    .await
    .map_err(Error::store)?;
  let algorithm = store
    .find_algorithm(source_name.to_owned())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::UnknownAlgorithm { line: 0, name: source_name.to_owned() })?;

  let edges: Vec<NewOrtholog> = pairs
    .into_iter()
    .map(|(from_gene, to_gene)| NewOrtholog {
      from_gene,
      to_gene,
      is_best: true,
      is_best_revised: true,
      is_best_adjusted: false,
      num_algorithms: 1,
      source_name: source_name.to_owned(),
      algorithms: vec![algorithm.alg_id],
    })
    .collect();
  for chunk in edges.chunks(batch_size.max(1)) {
    load.edges += store
      .insert_ortholog_batch(chunk.to_vec())
      .await
      .map_err(Error::store)?;
  }

  info!(
    species = load.species,
    genes = load.genes,
    edges = load.edges,
    clusters = clusters.len(),
    "catalog reconciled"
  );
  Ok(load)
}
