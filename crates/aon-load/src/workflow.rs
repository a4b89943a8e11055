//! The load workflow: one version per release, advanced step by step, marked
//! complete only after every step has succeeded.

use std::{path::PathBuf, time::Duration};

use aon_core::{
  catalog::InternalCatalog,
  store::VersionStore,
  version::{LoadState, Version, VersionId},
};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::{
  Error, Result,
  config::{LoadConfig, StepPolicy},
  homology::{HomologyLoad, compute_homology},
  loader::{self, BatchOptions, OrthologLoad},
  reconcile::{ReconcileLoad, reconcile},
  source::ReleaseSource,
  step::{StepDescriptor, cancelled, run_step},
};

/// Counters from one finished load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
  pub version:   Version,
  pub orthologs: OrthologLoad,
  pub reconcile: ReconcileLoad,
  pub homology:  HomologyLoad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// A version for the release already exists; nothing was done.
  AlreadyLoaded(Version),
  Loaded(Box<LoadReport>),
}

struct Steps {
  check:     StepDescriptor,
  fetch:     StepDescriptor,
  create:    StepDescriptor,
  species:   StepDescriptor,
  genes:     StepDescriptor,
  orthologs: StepDescriptor,
  reconcile: StepDescriptor,
  homology:  StepDescriptor,
  record:    StepDescriptor,
}

impl Steps {
  fn from_config(config: &LoadConfig) -> Self {
    let s = &config.steps;
    let backoff = Duration::from_secs(s.backoff_secs);
    let idempotent = |name: &'static str, policy: StepPolicy| {
      StepDescriptor::idempotent(name, policy).with_backoff(backoff)
    };
    let mutating = |name: &'static str, policy: StepPolicy| {
      StepDescriptor::mutating(name, policy).with_backoff(backoff)
    };
    Self {
      check:     idempotent("check", s.check),
      fetch:     idempotent("fetch", s.fetch),
      create:    mutating("create_version", StepPolicy { attempts: 1, ..s.check }),
      species:   mutating("species", s.load),
      genes:     mutating("genes", s.load),
      orthologs: mutating("orthologs", s.load),
      reconcile: mutating("reconcile", s.reconcile),
      homology:  mutating("homology", s.homology),
      record:    idempotent("record_state", s.check),
    }
  }
}

pub struct Pipeline<V, C, S> {
  versions: V,
  catalog:  Option<C>,
  source:   S,
  config:   LoadConfig,
  steps:    Steps,
  cancel:   watch::Receiver<bool>,
}

impl<V, C, S> Pipeline<V, C, S>
where
  V: VersionStore,
  C: InternalCatalog,
  S: ReleaseSource,
{
  pub fn new(versions: V, catalog: Option<C>, source: S, config: LoadConfig) -> Self {
    let (tx, cancel) = watch::channel(false);
    // Without a sender the flag can never be raised.
    drop(tx);
    Self { versions, catalog, source, steps: Steps::from_config(&config), config, cancel }
  }

  /// Observe `cancel`: raising it stops the load between or during steps.
  pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn versions(&self) -> &V { &self.versions }

  /// Load `release`, or the latest published release when `None`.
  pub async fn run(&self, release: Option<String>) -> Result<RunOutcome> {
    let mut cancel = self.cancel.clone();
    let release = match release {
      Some(release) => release,
      None => run_step(&self.steps.check, &mut cancel, || self.source.latest_release()).await?,
    };

    let span = info_span!("load", run_id = %Uuid::new_v4(), %release);
    async {
      let existing = run_step(&self.steps.check, &mut cancel, || {
        let release = release.clone();
        async move { self.versions.find_release(release).await.map_err(Error::store) }
      })
      .await?;
      if let Some(version) = existing {
        info!(version_id = version.id, state = %version.state, "release already has a version");
        return Ok(RunOutcome::AlreadyLoaded(version));
      }

      let feed =
        run_step(&self.steps.fetch, &mut cancel, || self.source.fetch(release.clone())).await?;
      let version = run_step(&self.steps.create, &mut cancel, || {
        let release = release.clone();
        async move { self.versions.create_version(release).await.map_err(Error::store) }
      })
      .await?;
      info!(version_id = version.id, schema = %version.schema_name, "version created");

      let report = self.drive(version, feed, &mut cancel).await?;
      Ok(RunOutcome::Loaded(Box::new(report)))
    }
    .instrument(span)
    .await
  }

  /// Continue an interrupted load from its last recorded state. The release
  /// file is fetched again through the source.
  pub async fn resume(&self, id: VersionId) -> Result<LoadReport> {
    let mut cancel = self.cancel.clone();
    let version = self
      .versions
      .get_version(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UnknownVersion(id))?;
    version.ensure_writable()?;

    let span = info_span!("resume", run_id = %Uuid::new_v4(), release = %version.release);
    async {
      let feed = run_step(&self.steps.fetch, &mut cancel, || {
        self.source.fetch(version.release.clone())
      })
      .await?;
      self.drive(version, feed, &mut cancel).await
    }
    .instrument(span)
    .await
  }

  async fn advance(
    &self,
    cancel: &mut watch::Receiver<bool>,
    version: &mut Version,
    to: LoadState,
  ) -> Result<()> {
    let id = version.id;
    *version = run_step(&self.steps.record, cancel, || async move {
      // A retry after a commit whose reply was lost finds the state in place.
      if let Some(current) = self.versions.get_version(id).await.map_err(Error::store)?
        && current.state == to
      {
        return Ok(current);
      }
      self.versions.record_state(id, to).await.map_err(Error::store)
    })
    .await?;
    info!(version_id = id, state = %to, "state recorded");
    Ok(())
  }

  /// Run every step after `version.state`, then mark the version complete.
  async fn drive(
    &self,
    mut version: Version,
    feed: PathBuf,
    cancel: &mut watch::Receiver<bool>,
  ) -> Result<LoadReport> {
    let data = self.versions.open_version(version.id).await.map_err(Error::store)?;
    let data = &data;
    let feed = feed.as_path();
    let mut report = LoadReport {
      version:   version.clone(),
      orthologs: OrthologLoad::default(),
      reconcile: ReconcileLoad::default(),
      homology:  HomologyLoad::default(),
    };

    if version.state < LoadState::SpeciesLoaded {
      run_step(&self.steps.species, cancel, || loader::load_species(data, feed)).await?;
      self.advance(cancel, &mut version, LoadState::SpeciesLoaded).await?;
    }

    if version.state < LoadState::GenesLoaded {
      let batch_size = self.config.batch_size;
      run_step(&self.steps.genes, cancel, || loader::load_genes(data, feed, batch_size)).await?;
      self.advance(cancel, &mut version, LoadState::GenesLoaded).await?;
    }

    if version.state < LoadState::OrthologsLoaded {
      let options = BatchOptions {
        batch_size:  self.config.batch_size,
        max_batches: self.config.max_batches,
      };
      report.orthologs =
        run_step(&self.steps.orthologs, cancel, || loader::load_orthologs(data, feed, options))
          .await?;
      self.advance(cancel, &mut version, LoadState::OrthologsLoaded).await?;
    }

    if version.state < LoadState::Reconciled {
      if let Some(catalog) = &self.catalog {
        let source = self.config.reconcile_source.as_str();
        let batch_size = self.config.batch_size;
        report.reconcile = run_step(&self.steps.reconcile, cancel, || {
          reconcile(data, catalog, source, batch_size)
        })
        .await?;
      } else {
        info!("no internal catalog configured, skipping reconciliation");
      }
      self.advance(cancel, &mut version, LoadState::Reconciled).await?;
    }

    if version.state < LoadState::HomologyComputed {
      let strategy = self.config.cluster_strategy;
      report.homology =
        run_step(&self.steps.homology, cancel, || compute_homology(data, strategy)).await?;
      self.advance(cancel, &mut version, LoadState::HomologyComputed).await?;
    }

    if *cancel.borrow() {
      return Err(Error::Cancelled);
    }
    report.version = self.versions.mark_complete(version.id).await.map_err(Error::store)?;
    info!(version_id = version.id, "version complete");
    Ok(report)
  }

  /// Run the workflow every `every` until cancelled. A failed run is logged
  /// and the next tick tries again.
  pub async fn schedule(&self, every: Duration) -> Result<()> {
    let mut cancel = self.cancel.clone();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => return Ok(()),
        _ = ticker.tick() => {}
      }

      match self.run(None).await {
        Ok(RunOutcome::AlreadyLoaded(version)) => {
          info!(release = %version.release, "latest release already loaded")
        }
        Ok(RunOutcome::Loaded(report)) => info!(
          release = %report.version.release,
          version_id = report.version.id,
          "scheduled load finished"
        ),
        Err(Error::Cancelled) => return Ok(()),
        Err(e) => error!(error = %e, "scheduled load failed"),
      }
    }
  }
}
