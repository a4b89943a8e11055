//! [`SqliteCatalog`]: read-only [`InternalCatalog`] over the internal gene
//! catalog's tables.

use std::{collections::BTreeMap, path::Path};

use aon_core::catalog::{
  CatalogGene, CatalogHomolog, CatalogSpecies, GeneDatabase, InternalCatalog,
};
use rusqlite::OpenFlags;

use crate::{Error, Result};

/// Ids per `IN (...)` list, under SQLite's bound-parameter limit.
const CHUNK: usize = 500;

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn gene_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogGene> {
  Ok(CatalogGene {
    ode_gene_id: r.get(0)?,
    ref_id:      r.get(1)?,
    gdb_id:      r.get(2)?,
    sp_id:       r.get(3)?,
  })
}

#[derive(Clone)]
pub struct SqliteCatalog {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteCatalog {
  /// Open the catalog database read-only.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;
    Ok(Self { conn })
  }

  /// Run `sql` (with one `{}` placeholder for an id list) once per chunk of
  /// `ids` and concatenate the rows.
  async fn chunked_genes(&self, sql: &'static str, ids: Vec<i64>) -> Result<Vec<CatalogGene>> {
    let genes = self
      .conn
      .call(move |conn| {
        let mut out = Vec::new();
        for chunk in ids.chunks(CHUNK) {
          let sql = sql.replace("{}", &placeholders(chunk.len()));
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt.query_map(rusqlite::params_from_iter(chunk), gene_from_row)?;
          for row in rows {
            out.push(row?);
          }
        }
        Ok(out)
      })
      .await?;
    Ok(genes)
  }
}

impl InternalCatalog for SqliteCatalog {
  type Error = Error;

  async fn species(&self) -> Result<Vec<CatalogSpecies>> {
    let species = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT sp_id, sp_name, sp_taxid FROM species ORDER BY sp_id")?;
        let rows = stmt
          .query_map([], |r| {
            Ok(CatalogSpecies { sp_id: r.get(0)?, name: r.get(1)?, taxon_id: r.get(2)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(species)
  }

  async fn gene_databases(&self) -> Result<Vec<GeneDatabase>> {
    let databases = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT gdb_id, gdb_name FROM genedb ORDER BY gdb_id")?;
        let rows = stmt
          .query_map([], |r| Ok(GeneDatabase { gdb_id: r.get(0)?, name: r.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(databases)
  }

  async fn genes_for_species(&self, sp_ids: Vec<i64>) -> Result<Vec<CatalogGene>> {
    self
      .chunked_genes(
        "SELECT ode_gene_id, ode_ref_id, gdb_id, sp_id FROM gene
         WHERE sp_id IN ({}) ORDER BY ode_gene_id, gdb_id",
        sp_ids,
      )
      .await
  }

  async fn genes_by_id(&self, ode_gene_ids: Vec<i64>) -> Result<Vec<CatalogGene>> {
    self
      .chunked_genes(
        "SELECT ode_gene_id, ode_ref_id, gdb_id, sp_id FROM gene
         WHERE ode_gene_id IN ({}) ORDER BY ode_gene_id, gdb_id",
        ode_gene_ids,
      )
      .await
  }

  async fn homology_for_genes(&self, ode_gene_ids: Vec<i64>) -> Result<Vec<CatalogHomolog>> {
    let members: BTreeMap<(i64, i64), i64> = self
      .conn
      .call(move |conn| {
        let mut members = BTreeMap::new();
        for chunk in ode_gene_ids.chunks(CHUNK) {
          let sql = format!(
            "SELECT hom_id, ode_gene_id, sp_id FROM homology
             WHERE hom_id IN (
               SELECT hom_id FROM homology WHERE ode_gene_id IN ({}))",
            placeholders(chunk.len())
          );
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt.query_map(rusqlite::params_from_iter(chunk), |r| {
            Ok(((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?), r.get::<_, i64>(2)?))
          })?;
          for row in rows {
            let (key, sp_id) = row?;
            members.insert(key, sp_id);
          }
        }
        Ok(members)
      })
      .await?;
    Ok(
      members
        .into_iter()
        .map(|((hom_id, ode_gene_id), sp_id)| CatalogHomolog { hom_id, ode_gene_id, sp_id })
        .collect(),
    )
  }
}
