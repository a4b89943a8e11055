//! Homology clustering: turn pairwise ortholog edges into clusters.
//!
//! Two strategies are available.
//!
//! [`ClusterStrategy::Streaming`] is the historical single pass. Each edge
//! `(u, v)` is examined against the assignments made by earlier edges:
//!
//! 1. if `u` is already clustered, `v` is appended to `u`'s cluster;
//! 2. independently, if `v` is already clustered, `u` is appended to `v`'s;
//! 3. if neither is clustered, both open a new cluster.
//!
//! A gene keeps the first cluster id it was assigned. When an edge joins two
//! previously formed clusters they are *not* merged: each endpoint is listed
//! in the other's cluster while keeping its own assignment, so one true
//! connected component can surface as several clusters and a gene can be
//! listed in more than one of them.
//!
//! [`ClusterStrategy::Connected`] computes true connected components with a
//! union-find and never produces that split.
//!
//! Both are deterministic for a fixed edge order. Cluster ids start at 1.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  gene::{GeneId, SpeciesId},
  ortholog::{ClusterId, Homology, OrthologEdge},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStrategy {
  #[default]
  Streaming,
  Connected,
}

/// A gene's place in a cluster, with the provenance of the edge that most
/// recently put it there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  pub gn_id:       GeneId,
  pub source_name: String,
}

/// The result of a clustering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clustering {
  assignment: HashMap<GeneId, ClusterId>,
  clusters:   BTreeMap<ClusterId, Vec<Member>>,
}

impl Clustering {
  /// The cluster id first assigned to `gene`.
  pub fn cluster_of(&self, gene: GeneId) -> Option<ClusterId> {
    self.assignment.get(&gene).copied()
  }

  /// De-duplicated members of a cluster, in first-placement order.
  pub fn members(&self, id: ClusterId) -> Option<&[Member]> {
    self.clusters.get(&id).map(Vec::as_slice)
  }

  pub fn cluster_ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
    self.clusters.keys().copied()
  }

  pub fn len(&self) -> usize { self.clusters.len() }

  pub fn is_empty(&self) -> bool { self.clusters.is_empty() }

  /// One [`Homology`] row per `(cluster, gene)` pair. `species_of` must know
  /// every clustered gene.
  pub fn into_rows<F>(self, species_of: F) -> Result<Vec<Homology>>
  where
    F: Fn(GeneId) -> Option<SpeciesId>,
  {
    let mut rows = Vec::new();
    for (hom_id, members) in self.clusters {
      for member in members {
        let sp_id = species_of(member.gn_id)
          .ok_or(Error::GeneWithoutSpecies(member.gn_id))?;
        rows.push(Homology {
          hom_id,
          gn_id: member.gn_id,
          sp_id,
          source_name: member.source_name,
        });
      }
    }
    Ok(rows)
  }
}

/// Cluster `edges`, visited in the order given.
pub fn cluster<'a, I>(strategy: ClusterStrategy, edges: I) -> Clustering
where
  I: IntoIterator<Item = &'a OrthologEdge>,
{
  match strategy {
    ClusterStrategy::Streaming => {
      let mut pass = StreamingPass::default();
      for edge in edges {
        pass.push(edge);
      }
      pass.finish()
    }
    ClusterStrategy::Connected => connected_components(edges),
  }
}

// ─── Streaming pass ──────────────────────────────────────────────────────────

#[derive(Default)]
struct StreamingPass {
  last_id:    ClusterId,
  assignment: HashMap<GeneId, ClusterId>,
  clusters:   BTreeMap<ClusterId, Vec<Member>>,
}

impl StreamingPass {
  fn push(&mut self, edge: &OrthologEdge) {
    let from = self.assignment.get(&edge.from_gene).copied();
    let to = self.assignment.get(&edge.to_gene).copied();

    if from.is_none() && to.is_none() {
      self.last_id += 1;
      let id = self.last_id;
      self.place(id, edge.from_gene, &edge.source_name);
      self.place(id, edge.to_gene, &edge.source_name);
      return;
    }
    if let Some(id) = from {
      self.place(id, edge.to_gene, &edge.source_name);
    }
    if let Some(id) = to {
      self.place(id, edge.from_gene, &edge.source_name);
    }
  }

  fn place(&mut self, id: ClusterId, gene: GeneId, source: &str) {
    self.clusters.entry(id).or_default().push(Member {
      gn_id:       gene,
      source_name: source.to_owned(),
    });
    self.assignment.entry(gene).or_insert(id);
  }

  fn finish(self) -> Clustering {
    Clustering {
      assignment: self.assignment,
      clusters:   self
        .clusters
        .into_iter()
        .map(|(id, members)| (id, dedup_members(members)))
        .collect(),
    }
  }
}

/// Keep each gene once, at its first position, with its latest provenance.
fn dedup_members(members: Vec<Member>) -> Vec<Member> {
  let mut position: HashMap<GeneId, usize> = HashMap::new();
  let mut out: Vec<Member> = Vec::with_capacity(members.len());
  for member in members {
    match position.get(&member.gn_id) {
      Some(&i) => out[i].source_name = member.source_name,
      None => {
        position.insert(member.gn_id, out.len());
        out.push(member);
      }
    }
  }
  out
}

// ─── Connected components ────────────────────────────────────────────────────

/// Union-find over dense indices with path halving and union by size.
struct DisjointSet {
  parent: Vec<usize>,
  size:   Vec<usize>,
}

impl DisjointSet {
  fn with_len(len: usize) -> Self {
    Self { parent: (0..len).collect(), size: vec![1; len] }
  }

  fn find(&mut self, mut x: usize) -> usize {
    while self.parent[x] != x {
      self.parent[x] = self.parent[self.parent[x]];
      x = self.parent[x];
    }
    x
  }

  fn union(&mut self, a: usize, b: usize) {
    let (mut a, mut b) = (self.find(a), self.find(b));
    if a == b {
      return;
    }
    if self.size[a] < self.size[b] {
      std::mem::swap(&mut a, &mut b);
    }
    self.parent[b] = a;
    self.size[a] += self.size[b];
  }
}

fn connected_components<'a, I>(edges: I) -> Clustering
where
  I: IntoIterator<Item = &'a OrthologEdge>,
{
  // Genes in first-seen order, with the provenance of the last edge touching
  // each one.
  let mut index: HashMap<GeneId, usize> = HashMap::new();
  let mut genes: Vec<Member> = Vec::new();
  let mut pairs: Vec<(usize, usize)> = Vec::new();

  for edge in edges {
    let mut slot = |gene: GeneId| -> usize {
      match index.get(&gene) {
        Some(&i) => {
          genes[i].source_name.clone_from(&edge.source_name);
          i
        }
        None => {
          index.insert(gene, genes.len());
          genes.push(Member {
            gn_id:       gene,
            source_name: edge.source_name.clone(),
          });
          genes.len() - 1
        }
      }
    };
    let a = slot(edge.from_gene);
    let b = slot(edge.to_gene);
    pairs.push((a, b));
  }

  let mut set = DisjointSet::with_len(genes.len());
  for &(a, b) in &pairs {
    set.union(a, b);
  }

  // Number components in the order their first gene appeared.
  let mut ids: HashMap<usize, ClusterId> = HashMap::new();
  let mut clustering = Clustering::default();
  for (i, member) in genes.into_iter().enumerate() {
    let root = set.find(i);
    let next = ids.len() as ClusterId + 1;
    let id = *ids.entry(root).or_insert(next);
    clustering.assignment.insert(member.gn_id, id);
    clustering.clusters.entry(id).or_default().push(member);
  }
  clustering
}

#[cfg(test)]
mod tests {
  use super::*;

  fn edge(ort_id: i64, from: GeneId, to: GeneId) -> OrthologEdge {
    OrthologEdge {
      ort_id,
      from_gene: from,
      to_gene: to,
      source_name: "AGR".into(),
    }
  }

  fn member_ids(c: &Clustering, id: ClusterId) -> Vec<GeneId> {
    c.members(id).unwrap().iter().map(|m| m.gn_id).collect()
  }

  const A: GeneId = 1;
  const B: GeneId = 2;
  const C: GeneId = 3;
  const D: GeneId = 4;

  #[test]
  fn chain_forms_one_cluster_in_either_order() {
    let forward = [edge(1, A, B), edge(2, B, C)];
    let c = cluster(ClusterStrategy::Streaming, &forward);
    assert_eq!(c.len(), 1);
    assert_eq!(member_ids(&c, 1), vec![A, B, C]);

    let backward = [edge(2, B, C), edge(1, A, B)];
    let c = cluster(ClusterStrategy::Streaming, &backward);
    assert_eq!(c.len(), 1);
    assert_eq!(member_ids(&c, 1), vec![B, C, A]);
  }

  #[test]
  fn streaming_does_not_merge_formed_clusters() {
    let edges = [edge(1, A, B), edge(2, C, D), edge(3, B, C)];
    let c = cluster(ClusterStrategy::Streaming, &edges);

    assert_eq!(c.len(), 2);
    assert_eq!(c.cluster_of(B), Some(1));
    assert_eq!(c.cluster_of(C), Some(2));
    assert_ne!(c.cluster_of(B), c.cluster_of(C));
    // Each endpoint is listed in the other's cluster.
    assert_eq!(member_ids(&c, 1), vec![A, B, C]);
    assert_eq!(member_ids(&c, 2), vec![C, D, B]);
  }

  #[test]
  fn connected_strategy_merges_the_component() {
    let edges = [edge(1, A, B), edge(2, C, D), edge(3, B, C)];
    let c = cluster(ClusterStrategy::Connected, &edges);

    assert_eq!(c.len(), 1);
    assert_eq!(c.cluster_of(B), c.cluster_of(C));
    assert_eq!(member_ids(&c, 1), vec![A, B, C, D]);
  }

  #[test]
  fn repeated_placements_are_deduplicated_with_latest_provenance() {
    let mut reverse = edge(2, B, A);
    reverse.source_name = "Homologene".into();
    let edges = [edge(1, A, B), reverse];
    let c = cluster(ClusterStrategy::Streaming, &edges);

    let members = c.members(1).unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.source_name == "Homologene"));
  }

  #[test]
  fn reruns_are_identical() {
    let edges = [
      edge(1, A, B),
      edge(2, C, D),
      edge(3, B, C),
      edge(4, D, 5),
      edge(5, 6, 7),
    ];
    for strategy in [ClusterStrategy::Streaming, ClusterStrategy::Connected] {
      assert_eq!(cluster(strategy, &edges), cluster(strategy, &edges));
    }
  }

  #[test]
  fn rows_carry_species_and_provenance() {
    let edges = [edge(1, A, B)];
    let rows = cluster(ClusterStrategy::Streaming, &edges)
      .into_rows(|gene| Some(gene * 10))
      .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], Homology {
      hom_id:      1,
      gn_id:       A,
      sp_id:       10,
      source_name: "AGR".into(),
    });

    let err = cluster(ClusterStrategy::Streaming, &edges)
      .into_rows(|_| None)
      .unwrap_err();
    assert!(matches!(err, Error::GeneWithoutSpecies(A)));
  }

  #[test]
  fn strategy_deserialises_lowercase() {
    let s: ClusterStrategy = serde_json::from_str("\"connected\"").unwrap();
    assert_eq!(s, ClusterStrategy::Connected);
  }
}
