//! Source (biological origin) payloads.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Organelle or genomic location the sequence came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genome {
    #[default]
    Unknown,
    Genomic,
    Chloroplast,
    Chromoplast,
    Kinetoplast,
    Mitochondrion,
    Plastid,
    Macronuclear,
    Extrachrom,
    Plasmid,
    Transposon,
    InsertionSeq,
    Cyanelle,
    Proviral,
    Virion,
    Nucleomorph,
    Apicoplast,
    Leucoplast,
    Proplastid,
    EndogenousVirus,
    Hydrogenosome,
    Chromosome,
    Chromatophore,
}

impl Genome {
    pub const ALL: [Genome; 23] = [
        Genome::Unknown,
        Genome::Genomic,
        Genome::Chloroplast,
        Genome::Chromoplast,
        Genome::Kinetoplast,
        Genome::Mitochondrion,
        Genome::Plastid,
        Genome::Macronuclear,
        Genome::Extrachrom,
        Genome::Plasmid,
        Genome::Transposon,
        Genome::InsertionSeq,
        Genome::Cyanelle,
        Genome::Proviral,
        Genome::Virion,
        Genome::Nucleomorph,
        Genome::Apicoplast,
        Genome::Leucoplast,
        Genome::Proplastid,
        Genome::EndogenousVirus,
        Genome::Hydrogenosome,
        Genome::Chromosome,
        Genome::Chromatophore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Genome::Unknown => "unknown",
            Genome::Genomic => "genomic",
            Genome::Chloroplast => "chloroplast",
            Genome::Chromoplast => "chromoplast",
            Genome::Kinetoplast => "kinetoplast",
            Genome::Mitochondrion => "mitochondrion",
            Genome::Plastid => "plastid",
            Genome::Macronuclear => "macronuclear",
            Genome::Extrachrom => "extrachromosomal",
            Genome::Plasmid => "plasmid",
            Genome::Transposon => "transposon",
            Genome::InsertionSeq => "insertion-seq",
            Genome::Cyanelle => "cyanelle",
            Genome::Proviral => "proviral",
            Genome::Virion => "virion",
            Genome::Nucleomorph => "nucleomorph",
            Genome::Apicoplast => "apicoplast",
            Genome::Leucoplast => "leucoplast",
            Genome::Proplastid => "proplastid",
            Genome::EndogenousVirus => "endogenous-virus",
            Genome::Hydrogenosome => "hydrogenosome",
            Genome::Chromosome => "chromosome",
            Genome::Chromatophore => "chromatophore",
        }
    }
}

impl FromStr for Genome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Genome::ALL
            .into_iter()
            .find(|genome| genome.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

/// How the organism came to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    Unknown,
    Natural,
    NaturalMutant,
    Mutant,
    Artificial,
    Synthetic,
    Other,
}

impl Origin {
    pub const ALL: [Origin; 7] = [
        Origin::Unknown,
        Origin::Natural,
        Origin::NaturalMutant,
        Origin::Mutant,
        Origin::Artificial,
        Origin::Synthetic,
        Origin::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Origin::Unknown => "unknown",
            Origin::Natural => "natural",
            Origin::NaturalMutant => "natural mutant",
            Origin::Mutant => "mutant",
            Origin::Artificial => "artificial",
            Origin::Synthetic => "synthetic",
            Origin::Other => "other",
        }
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Origin::ALL
            .into_iter()
            .find(|origin| origin.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

/// Organism modifier subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrgModSubtype {
    Strain,
    SubStrain,
    Isolate,
    Serotype,
    Serovar,
    Cultivar,
    Variety,
    SubSpecies,
    Host,
    SpecimenVoucher,
    CultureCollection,
    BioMaterial,
    Breed,
    Ecotype,
    Acronym,
    OldName,
    Note,
}

impl OrgModSubtype {
    pub const ALL: [OrgModSubtype; 17] = [
        OrgModSubtype::Strain,
        OrgModSubtype::SubStrain,
        OrgModSubtype::Isolate,
        OrgModSubtype::Serotype,
        OrgModSubtype::Serovar,
        OrgModSubtype::Cultivar,
        OrgModSubtype::Variety,
        OrgModSubtype::SubSpecies,
        OrgModSubtype::Host,
        OrgModSubtype::SpecimenVoucher,
        OrgModSubtype::CultureCollection,
        OrgModSubtype::BioMaterial,
        OrgModSubtype::Breed,
        OrgModSubtype::Ecotype,
        OrgModSubtype::Acronym,
        OrgModSubtype::OldName,
        OrgModSubtype::Note,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OrgModSubtype::Strain => "strain",
            OrgModSubtype::SubStrain => "sub-strain",
            OrgModSubtype::Isolate => "isolate",
            OrgModSubtype::Serotype => "serotype",
            OrgModSubtype::Serovar => "serovar",
            OrgModSubtype::Cultivar => "cultivar",
            OrgModSubtype::Variety => "variety",
            OrgModSubtype::SubSpecies => "sub-species",
            OrgModSubtype::Host => "host",
            OrgModSubtype::SpecimenVoucher => "specimen-voucher",
            OrgModSubtype::CultureCollection => "culture-collection",
            OrgModSubtype::BioMaterial => "bio-material",
            OrgModSubtype::Breed => "breed",
            OrgModSubtype::Ecotype => "ecotype",
            OrgModSubtype::Acronym => "acronym",
            OrgModSubtype::OldName => "old-name",
            OrgModSubtype::Note => "note-orgmod",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        OrgModSubtype::ALL
            .into_iter()
            .find(|subtype| subtype.name().eq_ignore_ascii_case(name))
    }
}

/// Sub-source subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubSourceSubtype {
    Chromosome,
    Map,
    Clone,
    Haplotype,
    CellLine,
    CellType,
    TissueType,
    DevStage,
    LabHost,
    Country,
    IsolationSource,
    CollectionDate,
    CollectedBy,
    IdentifiedBy,
    Sex,
    Note,
    Germline,
    Rearranged,
    Transgenic,
    EnvironmentalSample,
    Metagenomic,
}

impl SubSourceSubtype {
    pub const ALL: [SubSourceSubtype; 21] = [
        SubSourceSubtype::Chromosome,
        SubSourceSubtype::Map,
        SubSourceSubtype::Clone,
        SubSourceSubtype::Haplotype,
        SubSourceSubtype::CellLine,
        SubSourceSubtype::CellType,
        SubSourceSubtype::TissueType,
        SubSourceSubtype::DevStage,
        SubSourceSubtype::LabHost,
        SubSourceSubtype::Country,
        SubSourceSubtype::IsolationSource,
        SubSourceSubtype::CollectionDate,
        SubSourceSubtype::CollectedBy,
        SubSourceSubtype::IdentifiedBy,
        SubSourceSubtype::Sex,
        SubSourceSubtype::Note,
        SubSourceSubtype::Germline,
        SubSourceSubtype::Rearranged,
        SubSourceSubtype::Transgenic,
        SubSourceSubtype::EnvironmentalSample,
        SubSourceSubtype::Metagenomic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SubSourceSubtype::Chromosome => "chromosome",
            SubSourceSubtype::Map => "map",
            SubSourceSubtype::Clone => "clone",
            SubSourceSubtype::Haplotype => "haplotype",
            SubSourceSubtype::CellLine => "cell-line",
            SubSourceSubtype::CellType => "cell-type",
            SubSourceSubtype::TissueType => "tissue-type",
            SubSourceSubtype::DevStage => "dev-stage",
            SubSourceSubtype::LabHost => "lab-host",
            SubSourceSubtype::Country => "country",
            SubSourceSubtype::IsolationSource => "isolation-source",
            SubSourceSubtype::CollectionDate => "collection-date",
            SubSourceSubtype::CollectedBy => "collected-by",
            SubSourceSubtype::IdentifiedBy => "identified-by",
            SubSourceSubtype::Sex => "sex",
            SubSourceSubtype::Note => "note-subsrc",
            SubSourceSubtype::Germline => "germline",
            SubSourceSubtype::Rearranged => "rearranged",
            SubSourceSubtype::Transgenic => "transgenic",
            SubSourceSubtype::EnvironmentalSample => "environmental-sample",
            SubSourceSubtype::Metagenomic => "metagenomic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SubSourceSubtype::ALL
            .into_iter()
            .find(|subtype| subtype.name().eq_ignore_ascii_case(name))
    }

    /// Flag subtypes carry no text; their presence is the value.
    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            SubSourceSubtype::Germline
                | SubSourceSubtype::Rearranged
                | SubSourceSubtype::Transgenic
                | SubSourceSubtype::EnvironmentalSample
                | SubSourceSubtype::Metagenomic
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMod {
    pub subtype: OrgModSubtype,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSource {
    pub subtype: SubSourceSubtype,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRef {
    #[serde(default)]
    pub taxname: Option<String>,
    #[serde(default)]
    pub common: Option<String>,
    #[serde(default)]
    pub lineage: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub mods: Vec<OrgMod>,
}

/// Biological origin of a sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioSource {
    #[serde(default)]
    pub genome: Genome,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub org: OrgRef,
    #[serde(default)]
    pub subtypes: Vec<SubSource>,
}

impl BioSource {
    pub fn text_values(&self) -> Vec<&str> {
        let org = &self.org;
        let mut values: Vec<&str> = [&org.taxname, &org.common, &org.lineage, &org.division]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        values.extend(org.mods.iter().map(|m| m.value.as_str()));
        values.extend(
            self.subtypes
                .iter()
                .filter(|s| !s.subtype.is_flag())
                .map(|s| s.value.as_str()),
        );
        values
    }
}
