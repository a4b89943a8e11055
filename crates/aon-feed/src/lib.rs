//! Codec for the combined orthology release file.
//!
//! Decodes the TAB-delimited feed into typed rows. Pure synchronous; no
//! HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use aon_feed::FeedReader;
//!
//! let rows = FeedReader::open("ORTHOLOGY-ALLIANCE_COMBINED_28.tsv").unwrap();
//! for batch in rows.batches(10_000) {
//!   println!("{} rows", batch.unwrap().len());
//! }
//! ```

pub mod collect;
pub mod error;
mod parse;

use std::{fs::File, io::BufReader, path::Path};

pub use collect::{GeneEntry, Inventory, collect_genes};
pub use error::{Error, Result};
pub use parse::{BestCall, Batches, FeedReader, FeedRow, GeneRef, PREAMBLE_LINES, parse_row};

impl FeedReader<BufReader<File>> {
  /// Open an uncompressed release file from disk.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::new(BufReader::new(File::open(path)?))
  }
}

// ─── Shared test helpers ──────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_helpers {
  use crate::PREAMBLE_LINES;

  pub(crate) const ROW: &str = "WB:WBGene00000001\taap-1\tNCBITaxon:6239\tCaenorhabditis \
                                elegans\tFB:FBgn0000008\ta\tNCBITaxon:7227\tDrosophila \
                                melanogaster\tPANTHER|ZFIN\t2\t2\tYes\tNo";

  /// A release file with the fixed preamble, a header, and `rows`.
  pub(crate) fn feed(rows: &[&str]) -> String {
    let mut text = String::new();
    for i in 0..PREAMBLE_LINES {
      text.push_str(&format!("# preamble {i}\n"));
    }
    text.push_str("Gene1ID\tGene1Symbol\tGene1SpeciesTaxonID\tGene1SpeciesName\n");
    for row in rows {
      text.push_str(row);
      text.push('\n');
    }
    text
  }
}
