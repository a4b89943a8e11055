//! Where release files come from: the consortium download site, or a file
//! already on disk.

use std::{
  fs::File,
  future::Future,
  io::{BufReader, BufWriter, Write},
  path::{Path, PathBuf},
  time::Duration,
};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Result, config::SourceConfig};

pub trait ReleaseSource: Send + Sync {
  /// Tag of the newest published release.
  fn latest_release(&self) -> impl Future<Output = Result<String>> + Send + '_;

  /// Make the uncompressed release file for `release` available locally and
  /// return its path. Safe to call again after a failure.
  fn fetch(&self, release: String) -> impl Future<Output = Result<PathBuf>> + Send + '_;
}

/// Download location of the combined orthology file for `release`.
pub fn download_url(base: &str, release: &str, increment: u32) -> String {
  format!(
    "{}/{release}/ORTHOLOGY-ALLIANCE/COMBINED/ORTHOLOGY-ALLIANCE_COMBINED_{increment}.tsv.gz",
    base.trim_end_matches('/')
  )
}

/// Decompress `gz` into `out`, replacing any existing file. `out` only
/// appears once the whole stream has been decoded.
pub fn gunzip(gz: &Path, out: &Path) -> Result<()> {
  let dir = out.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  let mut reader = GzDecoder::new(BufReader::new(File::open(gz)?));
  let mut part = tempfile::NamedTempFile::new_in(dir)?;
  {
    let mut writer = BufWriter::new(part.as_file_mut());
    std::io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
  }
  part.persist(out).map_err(|e| e.error)?;
  Ok(())
}

async fn gunzip_beside(gz: PathBuf) -> Result<PathBuf> {
  let out = gz.with_extension("");
  let target = out.clone();
  tokio::task::spawn_blocking(move || gunzip(&gz, &target)).await??;
  Ok(out)
}

// ─── Alliance ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ReleaseInfo {
  #[serde(rename = "releaseVersion")]
  release_version: Option<String>,
}

/// The Alliance of Genome Resources download site.
pub struct AllianceSource {
  client: reqwest::Client,
  config: SourceConfig,
}

impl AllianceSource {
  pub fn new(config: SourceConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30 * 60))
      .build()?;
    Ok(Self { client, config })
  }
}

impl ReleaseSource for AllianceSource {
  async fn latest_release(&self) -> Result<String> {
    let resp = self
      .client
      .get(&self.config.release_info_url)
      .timeout(Duration::from_secs(30))
      .send()
      .await?
      .error_for_status()?;
    let info: ReleaseInfo = resp.json().await?;
    info
      .release_version
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| Error::ReleaseInfo("response carries no releaseVersion".into()))
  }

  async fn fetch(&self, release: String) -> Result<PathBuf> {
    let url =
      download_url(&self.config.download_base_url, &release, self.config.data_increment);
    let dir = self.config.download_dir.join(&release);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = url.rsplit('/').next().unwrap_or("orthology.tsv.gz");
    let gz = dir.join(file_name);
    let tsv = gz.with_extension("");
    if tokio::fs::try_exists(&tsv).await? {
      debug!(path = %tsv.display(), "release file already present");
      return Ok(tsv);
    }

    info!(%url, "downloading release file");
    let bytes = self
      .client
      .get(&url)
      .send()
      .await?
      .error_for_status()?
      .bytes()
      .await?;
    tokio::fs::write(&gz, &bytes).await?;
    info!(path = %gz.display(), bytes = bytes.len(), "downloaded");

    gunzip_beside(gz).await
  }
}

// ─── Local file ──────────────────────────────────────────────────────────────

/// A release file already on disk, loaded under an explicit tag. A `.gz`
/// path is decompressed next to itself.
pub struct LocalSource {
  release: String,
  path:    PathBuf,
}

impl LocalSource {
  pub fn new(release: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    Self { release: release.into(), path: path.into() }
  }
}

impl ReleaseSource for LocalSource {
  async fn latest_release(&self) -> Result<String> { Ok(self.release.clone()) }

  async fn fetch(&self, release: String) -> Result<PathBuf> {
    if release != self.release {
      return Err(Error::ReleaseInfo(format!(
        "local file holds release {}, not {release}",
        self.release
      )));
    }
    if self.path.extension().is_some_and(|ext| ext == "gz") {
      return gunzip_beside(self.path.clone()).await;
    }
    Ok(self.path.clone())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use flate2::{Compression, write::GzEncoder};

  use super::*;

  #[test]
  fn url_follows_the_download_layout() {
    assert_eq!(
      download_url("https://download.alliancegenome.org/", "7.3.0", 28),
      "https://download.alliancegenome.org/7.3.0/ORTHOLOGY-ALLIANCE/COMBINED/\
       ORTHOLOGY-ALLIANCE_COMBINED_28.tsv.gz"
    );
  }

  #[test]
  fn release_info_reads_release_version() {
    let info: ReleaseInfo =
      serde_json::from_str(r#"{"releaseVersion":"8.0.0","releaseDate":"2025-01-01"}"#).unwrap();
    assert_eq!(info.release_version.as_deref(), Some("8.0.0"));
    let info: ReleaseInfo = serde_json::from_str("{}").unwrap();
    assert_eq!(info.release_version, None);
  }

  #[tokio::test]
  async fn local_gzip_is_decompressed_beside_itself() {
    let dir = tempfile::tempdir().unwrap();
    let gz = dir.path().join("combined.tsv.gz");
    let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    enc.write_all(b"line one\nline two\n").unwrap();
    enc.finish().unwrap();

    let source = LocalSource::new("7.3.0", &gz);
    assert_eq!(source.latest_release().await.unwrap(), "7.3.0");
    let tsv = source.fetch("7.3.0".into()).await.unwrap();
    assert_eq!(tsv, dir.path().join("combined.tsv"));
    assert_eq!(std::fs::read_to_string(tsv).unwrap(), "line one\nline two\n");
  }

  #[test]
  fn truncated_gzip_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for i in 0..50_000 {
      writeln!(enc, "WB:WBGene{i:08}\tgene-{i}\tNCBITaxon:6239").unwrap();
    }
    let bytes = enc.finish().unwrap();
    let gz = dir.path().join("combined.tsv.gz");
    std::fs::write(&gz, &bytes[..bytes.len() / 2]).unwrap();

    let tsv = dir.path().join("combined.tsv");
    assert!(gunzip(&gz, &tsv).is_err());
    assert!(!tsv.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
  }

  #[test]
  fn gunzip_replaces_a_stale_file() {
    let dir = tempfile::tempdir().unwrap();
    let gz = dir.path().join("combined.tsv.gz");
    let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    enc.write_all(b"fresh\n").unwrap();
    enc.finish().unwrap();
    let tsv = dir.path().join("combined.tsv");
    std::fs::write(&tsv, "stale and longer\n").unwrap();

    gunzip(&gz, &tsv).unwrap();
    assert_eq!(std::fs::read_to_string(tsv).unwrap(), "fresh\n");
  }

  #[tokio::test]
  async fn local_source_refuses_other_releases() {
    let source = LocalSource::new("7.3.0", "/tmp/none.tsv");
    let err = source.fetch("8.0.0".into()).await.unwrap_err();
    assert!(matches!(err, Error::ReleaseInfo(_)));
  }
}
