//! Runtime configuration, deserialised by the `aon` binary from an optional
//! TOML file layered under `AON_*` environment variables.

use std::{path::PathBuf, time::Duration};

use aon_core::cluster::ClusterStrategy;
use serde::Deserialize;

pub const DEFAULT_RELEASE_INFO_URL: &str = "https://www.alliancegenome.org/api/releaseInfo";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://download.alliancegenome.org";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
  /// Directory holding the version registry and one database per version.
  pub store_root:       PathBuf,
  /// Internal gene catalog (SQLite, opened read-only). Without it the
  /// reconciliation step has nothing to add.
  pub catalog_path:     Option<PathBuf>,
  pub batch_size:       usize,
  /// Stop the ortholog pass after this many batches.
  pub max_batches:      Option<usize>,
  pub cluster_strategy: ClusterStrategy,
  /// Provenance name given to synthesized edges.
  pub reconcile_source: String,
  pub default_schema:   Option<String>,
  pub schedule_hours:   u64,
  pub source:           SourceConfig,
  pub steps:            StepsConfig,
}

impl Default for LoadConfig {
  fn default() -> Self {
    Self {
      store_root:       PathBuf::from("aon-data"),
      catalog_path:     None,
      batch_size:       10_000,
      max_batches:      None,
      cluster_strategy: ClusterStrategy::default(),
      reconcile_source: "Homologene".to_owned(),
      default_schema:   None,
      schedule_hours:   24,
      source:           SourceConfig::default(),
      steps:            StepsConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
  pub release_info_url:  String,
  pub download_base_url: String,
  pub data_increment:    u32,
  pub download_dir:      PathBuf,
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      release_info_url:  DEFAULT_RELEASE_INFO_URL.to_owned(),
      download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_owned(),
      data_increment:    28,
      download_dir:      PathBuf::from("downloads"),
    }
  }
}

/// Timeout and attempt budget for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StepPolicy {
  pub timeout_secs: u64,
  pub attempts:     u32,
}

impl StepPolicy {
  pub const fn new(timeout_secs: u64, attempts: u32) -> Self {
    Self { timeout_secs, attempts }
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
  /// Latest-release lookup and the version-exists check.
  pub check:     StepPolicy,
  pub fetch:     StepPolicy,
  /// Each of the species, gene, and ortholog passes.
  pub load:      StepPolicy,
  pub reconcile: StepPolicy,
  pub homology:  StepPolicy,
  /// Seconds before the first retry; doubles on each further attempt.
  pub backoff_secs: u64,
}

impl Default for StepsConfig {
  fn default() -> Self {
    Self {
      check:        StepPolicy::new(60, 5),
      fetch:        StepPolicy::new(30 * 60, 3),
      load:         StepPolicy::new(2 * 60 * 60, 1),
      reconcile:    StepPolicy::new(60 * 60, 1),
      homology:     StepPolicy::new(60 * 60, 2),
      backoff_secs: 5,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn from_toml(text: &str) -> LoadConfig {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    config::Config::builder()
      .add_source(config::File::from(file.path()))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.batch_size, 10_000);
    assert_eq!(cfg.cluster_strategy, ClusterStrategy::Streaming);
    assert_eq!(cfg.reconcile_source, "Homologene");
    assert_eq!(cfg.source.data_increment, 28);
    assert_eq!(cfg.steps.load, StepPolicy::new(7200, 1));
  }

  #[test]
  fn nested_keys_override_defaults() {
    let cfg = from_toml(
      r#"
        store_root = "/var/lib/aon"
        batch_size = 500
        cluster_strategy = "connected"

        [source]
        data_increment = 30

        [steps.fetch]
        timeout_secs = 10
        attempts = 7
      "#,
    );
    assert_eq!(cfg.store_root, PathBuf::from("/var/lib/aon"));
    assert_eq!(cfg.batch_size, 500);
    assert_eq!(cfg.cluster_strategy, ClusterStrategy::Connected);
    assert_eq!(cfg.source.data_increment, 30);
    assert_eq!(cfg.source.release_info_url, DEFAULT_RELEASE_INFO_URL);
    assert_eq!(cfg.steps.fetch, StepPolicy::new(10, 7));
    assert_eq!(cfg.steps.check, StepPolicy::new(60, 5));
  }
}
