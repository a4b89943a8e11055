//! Gene reference-id conversion between the external feed and the internal
//! catalog.
//!
//! The feed writes every reference id as `<prefix>:<id>`. The internal catalog
//! stores most ids without a prefix, and a handful of source databases differ
//! only in punctuation:
//!
//! | source   | internal       | external          |
//! |----------|----------------|-------------------|
//! | WormBase | `WBGene000001` | `WB:WBGene000001` |
//! | FlyBase  | `FBgn0000001`  | `FB:FBgn0000001`  |
//! | SGD      | `S000000001`   | `SGD:S000000001`  |
//! | ZFIN     | `ZDB-GENE-1`   | `ZFIN:ZDB-GENE-1` |
//! | RGD      | `RGD620664`    | `RGD:620664`      |
//! | others   | unchanged      | unchanged         |

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Gene source databases recognised by the internal catalog.
///
/// Parsing accepts the catalog's database names case-insensitively.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum SourceDb {
  Entrez,
  #[strum(to_string = "Ensembl Gene", serialize = "Ensembl")]
  Ensembl,
  #[strum(to_string = "Ensembl Protein")]
  EnsemblProtein,
  #[strum(to_string = "Ensembl Transcript")]
  EnsemblTranscript,
  Unigene,
  #[strum(to_string = "Gene Symbol", serialize = "Symbol")]
  GeneSymbol,
  Unannotated,
  #[strum(to_string = "MGI")]
  Mgi,
  #[strum(to_string = "HGNC")]
  Hgnc,
  #[strum(to_string = "RGD")]
  Rgd,
  #[strum(to_string = "ZFIN")]
  Zfin,
  FlyBase,
  WormBase,
  #[strum(to_string = "SGD")]
  Sgd,
  #[strum(to_string = "miRBase")]
  MirBase,
  #[strum(to_string = "CGNC")]
  Cgnc,
}

impl SourceDb {
  /// The tag stored in `Gene::prefix` for genes from this database.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Entrez => "entrez",
      Self::Ensembl => "ensembl",
      Self::EnsemblProtein => "ensembl_protein",
      Self::EnsemblTranscript => "ensembl_transcript",
      Self::Unigene => "unigene",
      Self::GeneSymbol => "symbol",
      Self::Unannotated => "unannotated",
      Self::Mgi => "MGI",
      Self::Hgnc => "HGNC",
      Self::Rgd => "RGD",
      Self::Zfin => "ZFIN",
      Self::FlyBase => "FB",
      Self::WormBase => "WB",
      Self::Sgd => "SGD",
      Self::MirBase => "miRBase",
      Self::Cgnc => "CGNC",
    }
  }

  /// Inverse of [`SourceDb::prefix`]; exact match.
  pub fn from_prefix(prefix: &str) -> Option<Self> {
    use strum::IntoEnumIterator;
    Self::iter().find(|db| db.prefix() == prefix)
  }
}

/// Text before the first `:` of an external reference id, or the whole id
/// when it carries no prefix.
pub fn prefix_of(external_ref: &str) -> &str {
  external_ref
    .split_once(':')
    .map_or(external_ref, |(prefix, _)| prefix)
}

/// Convert an internal-catalog reference id to the feed's form.
///
/// An untagged id (`source == None`) passes through unchanged.
pub fn to_external(internal_ref: &str, source: Option<SourceDb>) -> String {
  match source {
    Some(
      db @ (SourceDb::WormBase | SourceDb::FlyBase | SourceDb::Sgd | SourceDb::Zfin),
    ) => format!("{}:{internal_ref}", db.prefix()),
    Some(SourceDb::Rgd) => match (internal_ref.get(..3), internal_ref.get(3..)) {
      (Some(head), Some(tail)) => format!("{head}:{tail}"),
      _ => internal_ref.to_owned(),
    },
    _ => internal_ref.to_owned(),
  }
}

/// Convert a feed reference id to the internal catalog's form.
pub fn to_internal(external_ref: &str) -> String {
  let Some((prefix, rest)) = external_ref.split_once(':') else {
    return external_ref.to_owned();
  };
  match SourceDb::from_prefix(prefix) {
    Some(SourceDb::WormBase | SourceDb::FlyBase | SourceDb::Sgd | SourceDb::Zfin) => {
      rest.to_owned()
    }
    // RGD keeps its letters and loses only the colon.
    Some(SourceDb::Rgd) => format!("{prefix}{rest}"),
    _ => external_ref.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn prefixed_databases_gain_and_lose_their_tag() {
    assert_eq!(to_external("WBGene00000001", Some(SourceDb::WormBase)), "WB:WBGene00000001");
    assert_eq!(to_external("FBgn0000008", Some(SourceDb::FlyBase)), "FB:FBgn0000008");
    assert_eq!(to_external("S000000001", Some(SourceDb::Sgd)), "SGD:S000000001");
    assert_eq!(to_external("ZDB-GENE-990415-8", Some(SourceDb::Zfin)), "ZFIN:ZDB-GENE-990415-8");

    assert_eq!(to_internal("WB:WBGene00000001"), "WBGene00000001");
    assert_eq!(to_internal("ZFIN:ZDB-GENE-990415-8"), "ZDB-GENE-990415-8");
  }

  #[test]
  fn rgd_moves_only_the_colon() {
    assert_eq!(to_external("RGD620664", Some(SourceDb::Rgd)), "RGD:620664");
    assert_eq!(to_internal("RGD:620664"), "RGD620664");
  }

  #[test]
  fn other_databases_pass_through() {
    assert_eq!(to_external("HGNC:5", Some(SourceDb::Hgnc)), "HGNC:5");
    assert_eq!(to_external("MGI:87853", Some(SourceDb::Mgi)), "MGI:87853");
    assert_eq!(to_external("ENSG00000139618", Some(SourceDb::Ensembl)), "ENSG00000139618");
    assert_eq!(to_internal("HGNC:5"), "HGNC:5");
    assert_eq!(to_internal("ENSG00000139618"), "ENSG00000139618");
  }

  #[test]
  fn untagged_ids_are_identity() {
    assert_eq!(to_external("whatever", None), "whatever");
    assert_eq!(to_external("RG", Some(SourceDb::Rgd)), "RG");
  }

  #[test]
  fn every_source_round_trips() {
    for db in SourceDb::iter() {
      let raw = match db {
        SourceDb::Rgd => "RGD2003",
        SourceDb::Hgnc => "HGNC:1100",
        SourceDb::Mgi => "MGI:97490",
        _ => "GENE0042",
      };
      assert_eq!(to_internal(&to_external(raw, Some(db))), raw, "{db}");
    }
  }

  #[test]
  fn catalog_names_parse_case_insensitively() {
    assert_eq!("Wormbase".parse::<SourceDb>().unwrap(), SourceDb::WormBase);
    assert_eq!("Ensembl Gene".parse::<SourceDb>().unwrap(), SourceDb::Ensembl);
    assert_eq!("mirbase".parse::<SourceDb>().unwrap(), SourceDb::MirBase);
    assert!("Variant".parse::<SourceDb>().is_err());
  }

  #[test]
  fn prefixes_invert() {
    for db in SourceDb::iter() {
      assert_eq!(SourceDb::from_prefix(db.prefix()), Some(db));
    }
    assert_eq!(prefix_of("FB:FBgn0000008"), "FB");
    assert_eq!(prefix_of("ENSG00000139618"), "ENSG00000139618");
  }
}
