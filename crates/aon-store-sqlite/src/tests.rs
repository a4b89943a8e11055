//! Integration tests for the SQLite backend against in-memory and temporary
//! databases.

use aon_core::{
  catalog::InternalCatalog,
  gene::{NewGene, NewSpecies},
  ortholog::{FEED_SOURCE, Homology, NewOrtholog},
  store::{
    GeneQuery, HomologyQuery, OrthologQuery, OrthologStore, OrthologWriter, Page,
    SpeciesQuery, VersionStore,
  },
  version::LoadState,
};

use crate::{Error, SqliteCatalog, SqliteStore, SqliteVersions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// Two species, three genes, two algorithms.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.insert_species(vec![
    NewSpecies { name: "Caenorhabditis elegans".into(), taxon_id: 6239 },
    NewSpecies { name: "Drosophila melanogaster".into(), taxon_id: 7227 },
  ])
  .await
  .unwrap();
  let species = s.list_species(SpeciesQuery::default()).await.unwrap();
  let (worm, fly) = (species[0].sp_id, species[1].sp_id);

  s.insert_genes(vec![
    gene("WB:WBGene00000001", "WB", worm),
    gene("FB:FBgn0000008", "FB", fly),
    gene("FB:FBgn0000014", "FB", fly),
  ])
  .await
  .unwrap();
  s.insert_algorithms(vec!["PANTHER".into(), "ZFIN".into()])
    .await
    .unwrap();
  s
}

fn gene(ref_id: &str, prefix: &str, sp_id: i64) -> NewGene {
  NewGene { ref_id: ref_id.into(), prefix: prefix.into(), sp_id }
}

fn edge(from: i64, to: i64, algorithms: Vec<i64>, source: &str) -> NewOrtholog {
  NewOrtholog {
    from_gene: from,
    to_gene: to,
    is_best: true,
    is_best_revised: false,
    is_best_adjusted: false,
    num_algorithms: algorithms.len() as i64,
    source_name: source.into(),
    algorithms,
  }
}

// ─── Species, genes, algorithms ──────────────────────────────────────────────

#[tokio::test]
async fn inserts_skip_existing_rows() {
  let s = seeded().await;

  let again = s
    .insert_species(vec![NewSpecies { name: "Caenorhabditis elegans".into(), taxon_id: 6239 }])
    .await
    .unwrap();
  assert_eq!(again, 0);

  let worm = s.list_species(SpeciesQuery::default()).await.unwrap()[0].sp_id;
  let again = s
    .insert_genes(vec![gene("WB:WBGene00000001", "WB", worm)])
    .await
    .unwrap();
  assert_eq!(again, 0);
  assert_eq!(s.insert_algorithms(vec!["PANTHER".into()]).await.unwrap(), 0);
  assert_eq!(s.list_genes(GeneQuery::default()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn species_and_gene_filters() {
  let s = seeded().await;

  let fly = s
    .list_species(SpeciesQuery { taxon_id: Some(7227), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(fly.len(), 1);
  assert_eq!(fly[0].name, "Drosophila melanogaster");
  assert_eq!(s.get_species(fly[0].sp_id).await.unwrap(), Some(fly[0].clone()));

  let fly_genes = s
    .list_genes(GeneQuery { sp_id: Some(fly[0].sp_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(fly_genes.len(), 2);
  assert!(fly_genes.iter().all(|g| g.prefix == "FB"));

  let found = s.find_gene("FB:FBgn0000014".into()).await.unwrap().unwrap();
  assert_eq!(s.get_gene(found.gn_id).await.unwrap(), Some(found));
  assert!(s.find_gene("FB:missing".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn paging_applies_limit_and_offset() {
  let s = seeded().await;
  let page = s
    .list_genes(GeneQuery {
      page: Page { limit: Some(2), offset: Some(1) },
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].ref_id, "FB:FBgn0000008");
}

// ─── Orthologs ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ortholog_batch_round_trips_algorithm_sets() {
  let s = seeded().await;
  let algs = s.list_algorithms().await.unwrap();
  let panther = s.find_algorithm("PANTHER".into()).await.unwrap().unwrap();

  let n = s
    .insert_ortholog_batch(vec![
      edge(1, 2, vec![algs[0].alg_id, algs[1].alg_id], FEED_SOURCE),
      edge(2, 3, vec![algs[1].alg_id], FEED_SOURCE),
    ])
    .await
    .unwrap();
  assert_eq!(n, 2);

  let all = s.list_orthologs(OrthologQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].algorithms, vec![algs[0].alg_id, algs[1].alg_id]);

  let by_panther = s
    .list_orthologs(OrthologQuery { algorithm: Some(panther.alg_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_panther.len(), 1);
  assert_eq!(by_panther[0].to_gene, 2);

  let from_two = s
    .list_orthologs(OrthologQuery { from_gene: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(from_two.len(), 1);
  assert_eq!(from_two[0].algorithms, vec![algs[1].alg_id]);
}

#[tokio::test]
async fn empty_algorithm_set_is_rejected_before_writing() {
  let s = seeded().await;
  let err = s
    .insert_ortholog_batch(vec![edge(1, 2, vec![1], FEED_SOURCE), edge(2, 3, vec![], FEED_SOURCE)])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(aon_core::Error::EmptyAlgorithmSet { .. })));
  assert!(s.list_orthologs(OrthologQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_batch_commits_nothing() {
  let s = seeded().await;
  // Gene 99 does not exist; the foreign key fails mid-batch.
  let result = s
    .insert_ortholog_batch(vec![edge(1, 2, vec![1], FEED_SOURCE), edge(1, 99, vec![1], FEED_SOURCE)])
    .await;
  assert!(result.is_err());
  assert!(s.list_orthologs(OrthologQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_orthologs_is_scoped_to_provenance() {
  let s = seeded().await;
  s.insert_ortholog_batch(vec![
    edge(1, 2, vec![1], FEED_SOURCE),
    edge(1, 3, vec![2], "Homologene"),
  ])
  .await
  .unwrap();

  assert_eq!(s.delete_orthologs("Homologene".into()).await.unwrap(), 1);
  let rest = s.list_orthologs(OrthologQuery::default()).await.unwrap();
  assert_eq!(rest.len(), 1);
  assert_eq!(rest[0].source_name, FEED_SOURCE);

  let edges = s.ortholog_edges().await.unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!((edges[0].from_gene, edges[0].to_gene), (1, 2));
}

// ─── Homology ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_homology_overwrites_previous_rows() {
  let s = seeded().await;
  let row = |hom_id, gn_id, sp_id, source: &str| Homology {
    hom_id,
    gn_id,
    sp_id,
    source_name: source.into(),
  };

  s.replace_homology(vec![row(1, 1, 1, FEED_SOURCE), row(1, 2, 2, FEED_SOURCE)])
    .await
    .unwrap();
  s.replace_homology(vec![row(7, 2, 2, FEED_SOURCE), row(7, 3, 2, "Homologene")])
    .await
    .unwrap();

  let all = s.list_homology(HomologyQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().all(|h| h.hom_id == 7));

  let fly = s
    .list_homology(HomologyQuery { sp_id: Some(2), gn_id: Some(3), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(fly.len(), 1);
  assert_eq!(s.homology_sources().await.unwrap(), vec!["AGR", "Homologene"]);
}

// ─── Versions ────────────────────────────────────────────────────────────────

async fn walk_to(versions: &SqliteVersions, id: i64, last: LoadState) {
  let mut state = LoadState::Created;
  while state != last {
    let Some(next) = state.next() else { break };
    versions.record_state(id, next).await.unwrap();
    state = next;
  }
}

#[tokio::test]
async fn duplicate_release_is_rejected() {
  let versions = SqliteVersions::open_in_memory().await.unwrap();
  let v = versions.create_version("7.3.0".into()).await.unwrap();
  assert_eq!(v.state, LoadState::Created);
  assert!(!v.load_complete);
  assert_eq!(v.schema_name, "aon_7_3_0");

  let err = versions.create_version("7.3.0".into()).await.unwrap_err();
  assert!(matches!(err, Error::ReleaseExists(r) if r == "7.3.0"));
  assert_eq!(versions.find_release("7.3.0".into()).await.unwrap().unwrap().id, v.id);
}

#[tokio::test]
async fn mark_complete_requires_every_step() {
  let versions = SqliteVersions::open_in_memory().await.unwrap();
  let v = versions.create_version("7.3.0".into()).await.unwrap();

  assert!(versions.mark_complete(v.id).await.is_err());
  walk_to(&versions, v.id, LoadState::Reconciled).await;
  assert!(versions.mark_complete(v.id).await.is_err());
  assert!(versions.list_complete_versions().await.unwrap().is_empty());

  versions.record_state(v.id, LoadState::HomologyComputed).await.unwrap();
  let done = versions.mark_complete(v.id).await.unwrap();
  assert!(done.load_complete);
  assert_eq!(done.state, LoadState::Complete);

  // Complete versions are immutable.
  assert!(matches!(
    versions.record_state(v.id, LoadState::HomologyComputed).await,
    Err(Error::Core(aon_core::Error::VersionComplete(_)))
  ));
  assert!(versions.open_version(v.id).await.is_err());
}

#[tokio::test]
async fn states_cannot_be_skipped_or_set_complete() {
  let versions = SqliteVersions::open_in_memory().await.unwrap();
  let v = versions.create_version("8.0.0".into()).await.unwrap();

  assert!(versions.record_state(v.id, LoadState::GenesLoaded).await.is_err());
  walk_to(&versions, v.id, LoadState::HomologyComputed).await;
  assert!(versions.record_state(v.id, LoadState::Complete).await.is_err());
  assert!(matches!(
    versions.record_state(404, LoadState::SpeciesLoaded).await,
    Err(Error::VersionNotFound(404))
  ));
}

#[tokio::test]
async fn readers_only_see_complete_versions() {
  let versions = SqliteVersions::open_in_memory().await.unwrap();
  assert!(matches!(versions.open_complete(None).await, Err(Error::NoCompleteVersion)));

  let old = versions.create_version("7.3.0".into()).await.unwrap();
  walk_to(&versions, old.id, LoadState::HomologyComputed).await;
  versions.mark_complete(old.id).await.unwrap();

  let pending = versions.create_version("8.0.0".into()).await.unwrap();
  assert!(matches!(
    versions.open_complete(Some(pending.id)).await,
    Err(Error::VersionIncomplete(_))
  ));

  let (default, _) = versions.open_complete(None).await.unwrap();
  assert_eq!(default.id, old.id);

  let complete = versions.list_complete_versions().await.unwrap();
  assert_eq!(complete.len(), 1);
  assert!(complete.iter().all(|v| v.load_complete));
  assert_eq!(versions.list_versions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn configured_default_schema_wins_when_complete() {
  let versions = SqliteVersions::open_in_memory()
    .await
    .unwrap()
    .with_default_schema(Some("aon_7_3_0".into()));
  for release in ["7.3.0", "8.0.0"] {
    let v = versions.create_version(release.into()).await.unwrap();
    walk_to(&versions, v.id, LoadState::HomologyComputed).await;
    versions.mark_complete(v.id).await.unwrap();
  }
  let default = versions.default_version().await.unwrap().unwrap();
  assert_eq!(default.release, "7.3.0");
}

#[tokio::test]
async fn versions_are_isolated_on_disk() {
  let dir = tempfile::tempdir().unwrap();
  let versions = SqliteVersions::open(dir.path()).await.unwrap();

  let a = versions.create_version("7.3.0".into()).await.unwrap();
  let b = versions.create_version("8.0.0".into()).await.unwrap();
  let data_a = versions.open_version(a.id).await.unwrap();
  data_a
    .insert_algorithms(vec!["PANTHER".into()])
    .await
    .unwrap();

  let data_b = versions.open_version(b.id).await.unwrap();
  assert!(data_b.list_algorithms().await.unwrap().is_empty());
  assert!(dir.path().join("aon_7_3_0.sqlite").exists());
  assert!(dir.path().join("registry.sqlite").exists());

  // The registry survives reopening.
  let reopened = SqliteVersions::open(dir.path()).await.unwrap();
  assert_eq!(reopened.get_version(a.id).await.unwrap().unwrap().release, "7.3.0");
  let data_a = reopened.open_version(a.id).await.unwrap();
  assert_eq!(data_a.list_algorithms().await.unwrap().len(), 1);
}

// ─── Internal catalog ────────────────────────────────────────────────────────

fn write_catalog(path: &std::path::Path) {
  let conn = rusqlite::Connection::open(path).unwrap();
  conn
    .execute_batch(
      "CREATE TABLE species (sp_id INTEGER PRIMARY KEY, sp_name TEXT, sp_taxid INTEGER);
       CREATE TABLE genedb (gdb_id INTEGER PRIMARY KEY, gdb_name TEXT);
       CREATE TABLE gene (ode_gene_id INTEGER, ode_ref_id TEXT, gdb_id INTEGER, sp_id INTEGER);
       CREATE TABLE homology (hom_id INTEGER, ode_gene_id INTEGER, sp_id INTEGER);

       INSERT INTO species VALUES (2, 'Homo sapiens', 9606), (6, 'Macaca mulatta', 9544);
       INSERT INTO genedb VALUES (1, 'Entrez'), (7, 'HGNC'), (25, 'Variant');
       INSERT INTO gene VALUES
         (10, 'HGNC:5', 7, 2),
         (10, '1', 1, 2),
         (20, '574', 1, 6),
         (30, '999', 1, 6);
       INSERT INTO homology VALUES (100, 10, 2), (100, 20, 6), (200, 30, 6);",
    )
    .unwrap();
}

#[tokio::test]
async fn catalog_reads_species_genes_and_clusters() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("catalog.sqlite");
  write_catalog(&path);
  let catalog = SqliteCatalog::open(&path).await.unwrap();

  let species = catalog.species().await.unwrap();
  assert_eq!(species.len(), 2);
  assert_eq!(species[1].name, "Macaca mulatta");

  let dbs = catalog.gene_databases().await.unwrap();
  assert_eq!(dbs.iter().filter_map(|d| d.source()).count(), 2);

  let macaque = catalog.genes_for_species(vec![6]).await.unwrap();
  assert_eq!(macaque.len(), 2);

  let human = catalog.genes_by_id(vec![10]).await.unwrap();
  assert_eq!(human.len(), 2);

  let cluster = catalog.homology_for_genes(vec![20]).await.unwrap();
  let members: Vec<i64> = cluster.iter().map(|h| h.ode_gene_id).collect();
  assert_eq!(members, vec![10, 20]);
  assert!(catalog.homology_for_genes(vec![]).await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_is_opened_read_only() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("catalog.sqlite");
  write_catalog(&path);
  let catalog = SqliteCatalog::open(&path).await.unwrap();

  let write = catalog
    .conn
    .call(|conn| {
      conn.execute("DELETE FROM gene", [])?;
      Ok(())
    })
    .await;
  assert!(write.is_err());
}
