//! `aon` operator binary.
//!
//! Reads `aon.toml` (or the path given with `--config`) layered under
//! `AON_*` environment variables, opens the version registry, and runs the
//! load pipeline once, on a schedule, or resumes an interrupted load.
//!
//! ```text
//! aon run                                  # latest release from the Alliance
//! aon run --release 7.3.0 --file rel.tsv   # a file already on disk
//! aon resume --version 3 --file rel.tsv.gz
//! aon schedule --hours 24
//! aon versions
//! ```

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, bail};
use aon_core::store::VersionStore;
use aon_load::{AllianceSource, LoadConfig, LocalSource, Pipeline, ReleaseSource, RunOutcome};
use aon_store_sqlite::{SqliteCatalog, SqliteVersions};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Versioned ortholog normalizer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "aon.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load one release, unless a version for it already exists.
  Run {
    /// Release tag; defaults to the latest published release.
    #[arg(long)]
    release: Option<String>,
    /// Load this file (plain or `.gz`) instead of downloading.
    #[arg(long, requires = "release")]
    file:    Option<PathBuf>,
  },
  /// Continue an interrupted load from its last recorded state.
  Resume {
    #[arg(long)]
    version: i64,
    /// Read the release from this file (plain or `.gz`) instead of the
    /// download directory.
    #[arg(long)]
    file:    Option<PathBuf>,
  },
  /// Check for a new release on a fixed interval until interrupted.
  Schedule {
    #[arg(long)]
    hours: Option<u64>,
  },
  /// Print complete versions as JSON, newest first.
  Versions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("AON").separator("__"))
    .build()
    .context("failed to read config file")?;
  let mut cfg: LoadConfig = settings
    .try_deserialize()
    .context("failed to deserialise LoadConfig")?;
  cfg.store_root = expand_tilde(&cfg.store_root);
  cfg.source.download_dir = expand_tilde(&cfg.source.download_dir);
  cfg.catalog_path = cfg.catalog_path.as_deref().map(expand_tilde);

  let versions = SqliteVersions::open(&cfg.store_root)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_root))?
    .with_default_schema(cfg.default_schema.clone());

  match cli.command {
    Command::Versions => {
      let list = versions
        .list_complete_versions()
        .await
        .context("failed to list versions")?;
      println!("{}", serde_json::to_string_pretty(&list)?);
      Ok(())
    }
    Command::Run { release, file: Some(file) } => {
      let Some(release) = release else { bail!("--file needs --release") };
      let source = LocalSource::new(release.clone(), file);
      run_once(versions, source, cfg, Some(release)).await
    }
    Command::Run { release, file: None } => {
      let source = AllianceSource::new(cfg.source.clone()).context("failed to build HTTP client")?;
      run_once(versions, source, cfg, release).await
    }
    Command::Resume { version, file } => {
      let release = versions
        .get_version(version)
        .await
        .context("failed to read version")?
        .map(|v| v.release)
        .with_context(|| format!("no version with id {version}"))?;
      let report = match file {
        Some(file) => {
          let source = LocalSource::new(release, file);
          pipeline(versions, source, cfg).await?.resume(version).await
        }
        None => {
          let source =
            AllianceSource::new(cfg.source.clone()).context("failed to build HTTP client")?;
          pipeline(versions, source, cfg).await?.resume(version).await
        }
      }
      .context("resume failed")?;
      tracing::info!(
        version_id = report.version.id,
        release = %report.version.release,
        "load complete"
      );
      Ok(())
    }
    Command::Schedule { hours } => {
      let every = Duration::from_secs(hours.unwrap_or(cfg.schedule_hours).max(1) * 60 * 60);
      let source = AllianceSource::new(cfg.source.clone()).context("failed to build HTTP client")?;
      let pipeline = pipeline(versions, source, cfg).await?;
      tracing::info!(?every, "scheduler started");
      pipeline.schedule(every).await.context("scheduler failed")?;
      Ok(())
    }
  }
}

async fn run_once<S: ReleaseSource>(
  versions: SqliteVersions,
  source: S,
  cfg: LoadConfig,
  release: Option<String>,
) -> anyhow::Result<()> {
  let pipeline = pipeline(versions, source, cfg).await?;
  match pipeline.run(release).await.context("load failed")? {
    RunOutcome::AlreadyLoaded(version) => tracing::info!(
      version_id = version.id,
      release = %version.release,
      "release already loaded"
    ),
    RunOutcome::Loaded(report) => tracing::info!(
      version_id = report.version.id,
      release = %report.version.release,
      orthologs = report.orthologs.orthologs,
      synthesized = report.reconcile.edges,
      clusters = report.homology.clusters,
      "load complete"
    ),
  }
  Ok(())
}

/// Build the pipeline and wire Ctrl-C to its cancellation flag.
async fn pipeline<S: ReleaseSource>(
  versions: SqliteVersions,
  source: S,
  cfg: LoadConfig,
) -> anyhow::Result<Pipeline<SqliteVersions, SqliteCatalog, S>> {
  let catalog = match &cfg.catalog_path {
    Some(path) => Some(
      SqliteCatalog::open(path)
        .await
        .with_context(|| format!("failed to open internal catalog at {path:?}"))?,
    ),
    None => None,
  };

  let (tx, rx) = watch::channel(false);
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupt received, cancelling load");
      let _ = tx.send(true);
    }
  });

  Ok(Pipeline::new(versions, catalog, source, cfg).with_cancel(rx))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
