//! The single bidirectional species table shared by the normaliser and
//! reconciliation.
//!
//! Species ids differ between the two catalogs; display names do not. A
//! species converts only when both catalogs carry it under exactly the same
//! name.

use std::collections::HashMap;

use crate::gene::SpeciesId;

#[derive(Debug, Clone, Default)]
pub struct SpeciesMap {
  internal_names:   HashMap<i64, String>,
  external_names:   HashMap<SpeciesId, String>,
  internal_by_name: HashMap<String, i64>,
  external_by_name: HashMap<String, SpeciesId>,
}

impl SpeciesMap {
  /// Build the table from `(id, display name)` pairs of each catalog. The
  /// first id seen for a name wins.
  pub fn new<I, E, N, M>(internal: I, external: E) -> Self
  where
    I: IntoIterator<Item = (i64, N)>,
    E: IntoIterator<Item = (SpeciesId, M)>,
    N: Into<String>,
    M: Into<String>,
  {
    let mut map = Self::default();
    for (id, name) in internal {
      let name = name.into();
      map.internal_by_name.entry(name.clone()).or_insert(id);
      map.internal_names.insert(id, name);
    }
    for (id, name) in external {
      let name = name.into();
      map.external_by_name.entry(name.clone()).or_insert(id);
      map.external_names.insert(id, name);
    }
    map
  }

  /// Internal-catalog species id → feed species id.
  pub fn to_external_species(&self, internal_id: i64) -> Option<SpeciesId> {
    let name = self.internal_names.get(&internal_id)?;
    self.external_by_name.get(name).copied()
  }

  /// Feed species id → internal-catalog species id.
  pub fn to_internal_species(&self, external_id: SpeciesId) -> Option<i64> {
    let name = self.external_names.get(&external_id)?;
    self.internal_by_name.get(name).copied()
  }

  pub fn external_by_name(&self, name: &str) -> Option<SpeciesId> {
    self.external_by_name.get(name).copied()
  }

  pub fn internal_by_name(&self, name: &str) -> Option<i64> {
    self.internal_by_name.get(name).copied()
  }
}
