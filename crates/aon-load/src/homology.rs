//! The homology step: cluster every stored ortholog edge and replace the
//! version's homology table with the result.

use std::collections::HashMap;

use aon_core::{
  cluster::{ClusterStrategy, cluster},
  store::{GeneQuery, OrthologWriter},
};
use tracing::info;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomologyLoad {
  pub clusters: usize,
  pub rows:     u64,
}

pub async fn compute_homology<W: OrthologWriter>(
  store: &W,
  strategy: ClusterStrategy,
) -> Result<HomologyLoad> {
  let edges = store.ortholog_edges().await.map_err(Error::store)?;
  let species_of: HashMap<_, _> = store
    .list_genes(GeneQuery::default())
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|g| (g.gn_id, g.sp_id))
    .collect();

  let clustering = cluster(strategy, &edges);
  let clusters = clustering.len();
  let rows = clustering.into_rows(|gene| species_of.get(&gene).copied())?;

  let rows = store.replace_homology(rows).await.map_err(Error::store)?;
  info!(?strategy, edges = edges.len(), clusters, rows, "homology computed");
  Ok(HomologyLoad { clusters, rows })
}
