//! RNA payloads and the structured tRNA name grammar.
//!
//! A tRNA name such as `tRNA-Gly` or `Ala (GCA)` is stored as a
//! [`TrnaExt`]: a one-letter amino acid plus the codons it recognizes.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr};

use crate::ranges::SeqInterval;

lazy_static! {
    /// Three-letter amino acid abbreviations, keyed by lowercase abbreviation.
    static ref AMINO_ACIDS: HashMap<&'static str, (char, &'static str)> = {
        let table = [
            ("ala", 'A', "Ala"), ("arg", 'R', "Arg"), ("asn", 'N', "Asn"),
            ("asp", 'D', "Asp"), ("cys", 'C', "Cys"), ("gln", 'Q', "Gln"),
            ("glu", 'E', "Glu"), ("gly", 'G', "Gly"), ("his", 'H', "His"),
            ("ile", 'I', "Ile"), ("leu", 'L', "Leu"), ("lys", 'K', "Lys"),
            ("met", 'M', "Met"), ("phe", 'F', "Phe"), ("pro", 'P', "Pro"),
            ("ser", 'S', "Ser"), ("thr", 'T', "Thr"), ("trp", 'W', "Trp"),
            ("tyr", 'Y', "Tyr"), ("val", 'V', "Val"), ("sec", 'U', "Sec"),
            ("pyl", 'O', "Pyl"), ("xxx", 'X', "Xxx"),
        ];
        table
            .into_iter()
            .map(|(key, letter, abbrev)| (key, (letter, abbrev)))
            .collect()
    };

    static ref TRNA_NAME: Regex = Regex::new(
        r"^(?i)\s*(?:tRNA-)?([a-z]{3})\s*(?:\(\s*([acgtu]{3}(?:\s*,\s*[acgtu]{3})*)\s*\))?\s*$"
    )
    .expect("tRNA name grammar is a valid regex");
}

/// Kind of an RNA feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnaKind {
    #[default]
    Unknown,
    PreRna,
    Mrna,
    Trna,
    Rrna,
    Ncrna,
    Tmrna,
    Misc,
}

impl RnaKind {
    pub fn key(&self) -> &'static str {
        match self {
            RnaKind::Unknown => "RNA",
            RnaKind::PreRna => "precursor_RNA",
            RnaKind::Mrna => "mRNA",
            RnaKind::Trna => "tRNA",
            RnaKind::Rrna => "rRNA",
            RnaKind::Ncrna => "ncRNA",
            RnaKind::Tmrna => "tmRNA",
            RnaKind::Misc => "misc_RNA",
        }
    }
}

impl FromStr for RnaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "rna" => RnaKind::Unknown,
            "precursor_rna" | "prerna" => RnaKind::PreRna,
            "mrna" => RnaKind::Mrna,
            "trna" => RnaKind::Trna,
            "rrna" => RnaKind::Rrna,
            "ncrna" => RnaKind::Ncrna,
            "tmrna" => RnaKind::Tmrna,
            "misc_rna" | "misc" => RnaKind::Misc,
            _ => return Err(s.to_string()),
        };
        Ok(kind)
    }
}

/// Structured tRNA data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrnaExt {
    /// One-letter amino acid code.
    #[serde(default)]
    pub aa: Option<char>,
    /// Codons recognized, as uppercase DNA triplets.
    #[serde(default)]
    pub codons: Vec<String>,
    #[serde(default)]
    pub anticodon: Option<SeqInterval>,
}

impl TrnaExt {
    /// Whether secondary structured data (codons or anticodon) is present.
    pub fn has_secondary_data(&self) -> bool {
        !self.codons.is_empty() || self.anticodon.is_some()
    }

    /// The display name, `tRNA-Xxx`, if an amino acid is set.
    pub fn name(&self) -> Option<String> {
        self.aa.map(|aa| format!("tRNA-{}", three_letter_code(aa)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum RnaExt {
    #[default]
    None,
    Name { name: String },
    Trna(TrnaExt),
}

/// RNA payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RnaRef {
    #[serde(default)]
    pub kind: RnaKind,
    #[serde(default)]
    pub ext: RnaExt,
}

impl RnaRef {
    pub fn new(kind: RnaKind) -> Self {
        Self {
            kind,
            ext: RnaExt::None,
        }
    }

    /// The name held in the structured slot, if any.
    pub fn name(&self) -> Option<String> {
        match &self.ext {
            RnaExt::None => None,
            RnaExt::Name { name } => Some(name.clone()),
            RnaExt::Trna(trna) => trna.name(),
        }
    }

    pub fn trna(&self) -> Option<&TrnaExt> {
        match &self.ext {
            RnaExt::Trna(trna) => Some(trna),
            _ => None,
        }
    }

    pub fn text_values(&self) -> Vec<&str> {
        match &self.ext {
            RnaExt::None => Vec::new(),
            RnaExt::Name { name } => vec![name],
            RnaExt::Trna(trna) => trna.codons.iter().map(String::as_str).collect(),
        }
    }
}

/// The three-letter abbreviation of a one-letter amino acid code.
pub fn three_letter_code(aa: char) -> &'static str {
    AMINO_ACIDS
        .values()
        .find(|(letter, _)| *letter == aa.to_ascii_uppercase())
        .map_or("Xxx", |(_, abbrev)| abbrev)
}

/// Parse a tRNA name against the structured name grammar:
/// an optional `tRNA-` prefix, a three-letter amino acid, and an optional
/// parenthesized, comma-separated codon list.
///
/// Returns the one-letter amino acid and the codons (uppercase, `U`
/// written as `T`), or `None` if the text does not follow the grammar.
pub fn parse_trna_name(text: &str) -> Option<(char, Vec<String>)> {
    let captures = TRNA_NAME.captures(text)?;
    let abbrev = captures.get(1)?.as_str().to_ascii_lowercase();
    let (letter, _) = AMINO_ACIDS.get(abbrev.as_str())?;
    let codons = captures
        .get(2)
        .map(|list| {
            list.as_str()
                .split(',')
                .map(|codon| codon.trim().to_ascii_uppercase().replace('U', "T"))
                .collect()
        })
        .unwrap_or_default();
    Some((*letter, codons))
}
