//! Whole-file collectors for the loader's first two passes.

use std::collections::{BTreeMap, BTreeSet};

use aon_core::gene::NewSpecies;

use crate::{Result, parse::FeedRow};

/// Distinct species and algorithms named anywhere in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
  /// Keyed by taxon id; the first name seen for a taxon wins.
  pub species:    BTreeMap<i64, String>,
  pub algorithms: BTreeSet<String>,
}

impl Inventory {
  pub fn collect<I>(rows: I) -> Result<Self>
  where
    I: IntoIterator<Item = Result<FeedRow>>,
  {
    let mut inventory = Self::default();
    for row in rows {
      let row = row?;
      for gene in [&row.from, &row.to] {
        inventory
          .species
          .entry(gene.taxon_id)
          .or_insert_with(|| gene.species.clone());
      }
      inventory.algorithms.extend(row.algorithms);
    }
    Ok(inventory)
  }

  pub fn new_species(&self) -> Vec<NewSpecies> {
    self
      .species
      .iter()
      .map(|(&taxon_id, name)| NewSpecies { name: name.clone(), taxon_id })
      .collect()
  }
}

/// A gene as first seen in the file, before species ids are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneEntry {
  pub prefix:   String,
  pub taxon_id: i64,
}

/// Every distinct gene reference id on either side of any row.
///
/// A reference id that appears under two taxa keeps the last one seen.
pub fn collect_genes<I>(rows: I) -> Result<BTreeMap<String, GeneEntry>>
where
  I: IntoIterator<Item = Result<FeedRow>>,
{
  let mut genes = BTreeMap::new();
  for row in rows {
    let row = row?;
    for gene in [row.from, row.to] {
      let entry = GeneEntry {
        prefix:   gene.prefix().to_owned(),
        taxon_id: gene.taxon_id,
      };
      genes.insert(gene.ref_id, entry);
    }
  }
  Ok(genes)
}
