//! Line reader and row decoder for the combined orthology release.
//!
//! Pipeline:
//!   BufRead
//!     └─ FeedReader::new()   skip preamble + header
//!          └─ next()         → Result<FeedRow>
//!               └─ batches() → Result<Vec<FeedRow>>

use std::io::BufRead;

use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Fixed number of comment lines before the column header.
pub const PREAMBLE_LINES: usize = 15;

// Column positions, zero-based.
const COL_FROM_ID: usize = 0;
const COL_FROM_SYMBOL: usize = 1;
const COL_FROM_TAXON: usize = 2;
const COL_FROM_SPECIES: usize = 3;
const COL_TO_ID: usize = 4;
const COL_TO_SYMBOL: usize = 5;
const COL_TO_TAXON: usize = 6;
const COL_TO_SPECIES: usize = 7;
const COL_ALGORITHMS: usize = 8;
const COL_COUNT: usize = 10;
const COL_BEST: usize = 11;
const COL_BEST_REVISED: usize = 12;
const MIN_COLUMNS: usize = COL_BEST_REVISED + 1;

// ─── Row types ───────────────────────────────────────────────────────────────

/// The feed's best-call vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BestCall {
  Yes,
  No,
  #[strum(serialize = "Yes_Adjusted")]
  YesAdjusted,
}

impl BestCall {
  pub fn is_best(self) -> bool { !matches!(self, Self::No) }

  pub fn is_adjusted(self) -> bool { matches!(self, Self::YesAdjusted) }
}

/// One side of an ortholog pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRef {
  /// External reference id, e.g. `FB:FBgn0000008`.
  pub ref_id:   String,
  pub symbol:   String,
  pub taxon_id: i64,
  pub species:  String,
}

impl GeneRef {
  /// Source-database tag: the text before the first `:`.
  pub fn prefix(&self) -> &str { aon_core::refid::prefix_of(&self.ref_id) }
}

/// A decoded data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
  /// 1-based line number in the file.
  pub line:           usize,
  pub from:           GeneRef,
  pub to:             GeneRef,
  pub algorithms:     Vec<String>,
  pub num_algorithms: i64,
  pub best:           BestCall,
  pub best_revised:   BestCall,
}

// ─── Decoding ────────────────────────────────────────────────────────────────

fn parse_taxon(line: usize, value: &str) -> Result<i64> {
  value
    .trim()
    .strip_prefix("NCBITaxon:")
    .and_then(|n| n.parse().ok())
    .ok_or_else(|| Error::InvalidTaxon { line, value: value.to_owned() })
}

fn parse_best(line: usize, column: usize, value: &str) -> Result<BestCall> {
  value.trim().parse().map_err(|_| Error::InvalidBestCall {
    line,
    column,
    value: value.to_owned(),
  })
}

fn gene_ref(
  line: usize,
  cols: &[&str],
  [id, symbol, taxon, species]: [usize; 4],
) -> Result<GeneRef> {
  let ref_id = cols[id].trim();
  if ref_id.is_empty() {
    return Err(Error::EmptyGeneRef { line });
  }
  Ok(GeneRef {
    ref_id:   ref_id.to_owned(),
    symbol:   cols[symbol].trim().to_owned(),
    taxon_id: parse_taxon(line, cols[taxon])?,
    species:  cols[species].trim().to_owned(),
  })
}

/// Decode one TAB-delimited data line.
pub fn parse_row(line: usize, text: &str) -> Result<FeedRow> {
  let cols: Vec<&str> = text.split('\t').collect();
  if cols.len() < MIN_COLUMNS {
    return Err(Error::MissingColumns {
      line,
      expected: MIN_COLUMNS,
      found: cols.len(),
    });
  }

  let from = gene_ref(line, &cols, [
    COL_FROM_ID,
    COL_FROM_SYMBOL,
    COL_FROM_TAXON,
    COL_FROM_SPECIES,
  ])?;
  let to = gene_ref(line, &cols, [
    COL_TO_ID,
    COL_TO_SYMBOL,
    COL_TO_TAXON,
    COL_TO_SPECIES,
  ])?;

  let algorithms: Vec<String> = cols[COL_ALGORITHMS]
    .split('|')
    .map(str::trim)
    .filter(|a| !a.is_empty())
    .map(str::to_owned)
    .collect();
  if algorithms.is_empty() {
    return Err(Error::EmptyAlgorithms { line });
  }

  let count = cols[COL_COUNT].trim();
  let num_algorithms = count.parse().map_err(|_| Error::InvalidCount {
    line,
    value: count.to_owned(),
  })?;

  Ok(FeedRow {
    line,
    from,
    to,
    algorithms,
    num_algorithms,
    best: parse_best(line, COL_BEST, cols[COL_BEST])?,
    best_revised: parse_best(line, COL_BEST_REVISED, cols[COL_BEST_REVISED])?,
  })
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// Streaming reader over the data rows of a release file.
///
/// Iteration yields rows in file order and stops after the first error.
pub struct FeedReader<R> {
  lines:  std::io::Lines<R>,
  line:   usize,
  failed: bool,
}

impl<R: BufRead> FeedReader<R> {
  /// Consume the preamble and the column header.
  pub fn new(reader: R) -> Result<Self> {
    let mut lines = reader.lines();
    for read in 0..=PREAMBLE_LINES {
      match lines.next() {
        Some(line) => {
          line?;
        }
        None => return Err(Error::TruncatedPreamble { lines: read }),
      }
    }
    Ok(Self { lines, line: PREAMBLE_LINES + 1, failed: false })
  }

  /// Group rows into vectors of at most `size` rows.
  pub fn batches(self, size: usize) -> Batches<R> {
    Batches { rows: self, size: size.max(1) }
  }
}

impl<R: BufRead> Iterator for FeedReader<R> {
  type Item = Result<FeedRow>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }
    loop {
      let text = match self.lines.next()? {
        Ok(text) => text,
        Err(e) => {
          self.failed = true;
          return Some(Err(e.into()));
        }
      };
      self.line += 1;
      let text = text.trim_end_matches('\r');
      if text.trim().is_empty() {
        continue;
      }
      let row = parse_row(self.line, text);
      self.failed = row.is_err();
      return Some(row);
    }
  }
}

pub struct Batches<R> {
  rows: FeedReader<R>,
  size: usize,
}

impl<R: BufRead> Iterator for Batches<R> {
  type Item = Result<Vec<FeedRow>>;

  fn next(&mut self) -> Option<Self::Item> {
    let mut batch = Vec::with_capacity(self.size);
    for row in self.rows.by_ref() {
      match row {
        Ok(row) => batch.push(row),
        Err(e) => return Some(Err(e)),
      }
      if batch.len() == self.size {
        break;
      }
    }
    (!batch.is_empty()).then_some(Ok(batch))
  }
}
