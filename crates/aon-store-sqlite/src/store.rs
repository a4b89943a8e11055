//! [`SqliteStore`]: one version's tables, implementing [`OrthologStore`] and
//! [`OrthologWriter`].

use std::path::Path;

use aon_core::{
  gene::{Algorithm, Gene, GeneId, NewGene, NewSpecies, Species, SpeciesId},
  ortholog::{Homology, NewOrtholog, Ortholog, OrthologEdge},
  store::{
    GeneQuery, HomologyQuery, OrthologQuery, OrthologStore, OrthologWriter, Page,
    SpeciesQuery,
  },
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{Result, encode::RawOrtholog, schema::DATA_SCHEMA};

/// `LIMIT`/`OFFSET` values; SQLite treats a negative limit as unbounded.
fn page_params(page: Page) -> (i64, i64) {
  let limit = page.limit.map_or(-1, |l| l as i64);
  let offset = page.offset.unwrap_or(0) as i64;
  (limit, offset)
}

fn species_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Species> {
  Ok(Species { sp_id: r.get(0)?, name: r.get(1)?, taxon_id: r.get(2)? })
}

fn gene_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Gene> {
  Ok(Gene {
    gn_id:  r.get(0)?,
    ref_id: r.get(1)?,
    prefix: r.get(2)?,
    sp_id:  r.get(3)?,
  })
}

const ORTHOLOG_SELECT: &str = "
  SELECT o.ort_id, o.from_gene, o.to_gene, o.ort_is_best, o.ort_is_best_revised,
         o.ort_is_best_is_adjusted, o.ort_num_possible_match_algorithms,
         o.ort_source_name, GROUP_CONCAT(a.alg_id)
  FROM ort_ortholog o
  LEFT JOIN ora_ortholog_algorithms a ON a.ort_id = o.ort_id";

// ─── Store ───────────────────────────────────────────────────────────────────

/// The tables of one version, backed by a single SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a version database at `path` and initialise its schema.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DATA_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── OrthologStore impl ──────────────────────────────────────────────────────

impl OrthologStore for SqliteStore {
  type Error = crate::Error;

  async fn list_species(&self, query: SpeciesQuery) -> Result<Vec<Species>> {
    let (limit, offset) = page_params(query.page);
    let species = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sp_id, sp_name, sp_taxon_id FROM sp_species
           WHERE (?1 IS NULL OR sp_name = ?1)
             AND (?2 IS NULL OR sp_taxon_id = ?2)
           ORDER BY sp_id
           LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![query.name, query.taxon_id, limit, offset],
            species_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(species)
  }

  async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>> {
    let species = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT sp_id, sp_name, sp_taxon_id FROM sp_species WHERE sp_id = ?1",
            rusqlite::params![id],
            species_from_row,
          )
          .optional()?;
        Ok(row)
      })
      .await?;
    Ok(species)
  }

  async fn list_genes(&self, query: GeneQuery) -> Result<Vec<Gene>> {
    let (limit, offset) = page_params(query.page);
    let genes = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT gn_id, gn_ref_id, gn_prefix, sp_id FROM gn_gene
           WHERE (?1 IS NULL OR gn_ref_id = ?1)
             AND (?2 IS NULL OR gn_prefix = ?2)
             AND (?3 IS NULL OR sp_id = ?3)
           ORDER BY gn_id
           LIMIT ?4 OFFSET ?5",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![query.ref_id, query.prefix, query.sp_id, limit, offset],
            gene_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(genes)
  }

  async fn get_gene(&self, id: GeneId) -> Result<Option<Gene>> {
    let gene = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT gn_id, gn_ref_id, gn_prefix, sp_id FROM gn_gene WHERE gn_id = ?1",
            rusqlite::params![id],
            gene_from_row,
          )
          .optional()?;
        Ok(row)
      })
      .await?;
    Ok(gene)
  }

  async fn find_gene(&self, ref_id: String) -> Result<Option<Gene>> {
    let gene = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT gn_id, gn_ref_id, gn_prefix, sp_id FROM gn_gene WHERE gn_ref_id = ?1",
            rusqlite::params![ref_id],
            gene_from_row,
          )
          .optional()?;
        Ok(row)
      })
      .await?;
    Ok(gene)
  }

  async fn list_algorithms(&self) -> Result<Vec<Algorithm>> {
    let algorithms = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT alg_id, alg_name FROM alg_algorithm ORDER BY alg_id")?;
        let rows = stmt
          .query_map([], |r| Ok(Algorithm { alg_id: r.get(0)?, name: r.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(algorithms)
  }

  async fn find_algorithm(&self, name: String) -> Result<Option<Algorithm>> {
    let algorithm = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT alg_id, alg_name FROM alg_algorithm WHERE alg_name = ?1",
            rusqlite::params![name],
            |r| Ok(Algorithm { alg_id: r.get(0)?, name: r.get(1)? }),
          )
          .optional()?;
        Ok(row)
      })
      .await?;
    Ok(algorithm)
  }

  async fn list_orthologs(&self, query: OrthologQuery) -> Result<Vec<Ortholog>> {
    let (limit, offset) = page_params(query.page);
    let raws: Vec<RawOrtholog> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{ORTHOLOG_SELECT}
           WHERE (?1 IS NULL OR o.from_gene = ?1)
             AND (?2 IS NULL OR o.to_gene = ?2)
             AND (?3 IS NULL OR o.ort_source_name = ?3)
             AND (?4 IS NULL OR o.ort_is_best = ?4)
             AND (?5 IS NULL OR o.ort_is_best_revised = ?5)
             AND (?6 IS NULL OR EXISTS (
                   SELECT 1 FROM ora_ortholog_algorithms x
                   WHERE x.ort_id = o.ort_id AND x.alg_id = ?6))
           GROUP BY o.ort_id
           ORDER BY o.ort_id
           LIMIT ?7 OFFSET ?8"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              query.from_gene,
              query.to_gene,
              query.source_name,
              query.is_best,
              query.is_best_revised,
              query.algorithm,
              limit,
              offset,
            ],
            RawOrtholog::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawOrtholog::into_ortholog).collect()
  }

  async fn ortholog_edges(&self) -> Result<Vec<OrthologEdge>> {
    let edges = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT ort_id, from_gene, to_gene, ort_source_name
           FROM ort_ortholog ORDER BY ort_id",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(OrthologEdge {
              ort_id:      r.get(0)?,
              from_gene:   r.get(1)?,
              to_gene:     r.get(2)?,
              source_name: r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(edges)
  }

  async fn list_homology(&self, query: HomologyQuery) -> Result<Vec<Homology>> {
    let (limit, offset) = page_params(query.page);
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT hom_id, gn_id, sp_id, hom_source_name FROM hom_homology
           WHERE (?1 IS NULL OR hom_id = ?1)
             AND (?2 IS NULL OR gn_id = ?2)
             AND (?3 IS NULL OR sp_id = ?3)
             AND (?4 IS NULL OR hom_source_name = ?4)
           ORDER BY hom_id, gn_id
           LIMIT ?5 OFFSET ?6",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              query.hom_id,
              query.gn_id,
              query.sp_id,
              query.source_name,
              limit,
              offset,
            ],
            |r| {
              Ok(Homology {
                hom_id:      r.get(0)?,
                gn_id:       r.get(1)?,
                sp_id:       r.get(2)?,
                source_name: r.get(3)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn homology_sources(&self) -> Result<Vec<String>> {
    let sources = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT hom_source_name FROM hom_homology ORDER BY hom_source_name",
        )?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(sources)
  }
}

// ─── OrthologWriter impl ─────────────────────────────────────────────────────

impl OrthologWriter for SqliteStore {
  async fn insert_species(&self, species: Vec<NewSpecies>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO sp_species (sp_name, sp_taxon_id) VALUES (?1, ?2)",
          )?;
          for s in &species {
            inserted += stmt.execute(rusqlite::params![s.name, s.taxon_id])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    debug!(inserted, "species inserted");
    Ok(inserted)
  }

  async fn insert_algorithms(&self, names: Vec<String>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO alg_algorithm (alg_name) VALUES (?1)")?;
          for name in &names {
            inserted += stmt.execute(rusqlite::params![name])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    debug!(inserted, "algorithms inserted");
    Ok(inserted)
  }

  async fn insert_genes(&self, genes: Vec<NewGene>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO gn_gene (gn_ref_id, gn_prefix, sp_id)
             VALUES (?1, ?2, ?3)",
          )?;
          for g in &genes {
            inserted += stmt.execute(rusqlite::params![g.ref_id, g.prefix, g.sp_id])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    debug!(inserted, "genes inserted");
    Ok(inserted)
  }

  async fn insert_ortholog_batch(&self, batch: Vec<NewOrtholog>) -> Result<u64> {
    for ortholog in &batch {
      ortholog.validate()?;
    }

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut ort = tx.prepare(
            "INSERT INTO ort_ortholog (
               from_gene, to_gene, ort_is_best, ort_is_best_revised,
               ort_is_best_is_adjusted, ort_num_possible_match_algorithms,
               ort_source_name
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          let mut ora = tx.prepare(
            "INSERT OR IGNORE INTO ora_ortholog_algorithms (ort_id, alg_id)
             VALUES (?1, ?2)",
          )?;
          for o in &batch {
            let ort_id = ort.insert(rusqlite::params![
              o.from_gene,
              o.to_gene,
              o.is_best,
              o.is_best_revised,
              o.is_best_adjusted,
              o.num_algorithms,
              o.source_name,
            ])?;
            for alg_id in &o.algorithms {
              ora.execute(rusqlite::params![ort_id, alg_id])?;
            }
          }
        }
        tx.commit()?;
        Ok(batch.len() as u64)
      })
      .await?;
    Ok(inserted)
  }

  async fn delete_orthologs(&self, source_name: String) -> Result<u64> {
    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM ort_ortholog WHERE ort_source_name = ?1",
          rusqlite::params![source_name],
        )?;
        Ok(n as u64)
      })
      .await?;
    Ok(deleted)
  }

  async fn replace_homology(&self, rows: Vec<Homology>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM hom_homology", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO hom_homology (hom_id, gn_id, sp_id, hom_source_name)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for h in &rows {
            stmt.execute(rusqlite::params![h.hom_id, h.gn_id, h.sp_id, h.source_name])?;
          }
        }
        tx.commit()?;
        Ok(rows.len() as u64)
      })
      .await?;
    Ok(inserted)
  }
}
