//! Annotation object types: features, descriptors and their payloads.
//!
//! These mirror the shape of the externally-owned annotation graph. The
//! engine mutates field contents in place but never creates or destroys
//! objects, with the single exception of placeholder protein features (see
//! [`AnnotationGraph::ensure_protein_feature`]).
//!
//! [`AnnotationGraph::ensure_protein_feature`]: crate::graph::AnnotationGraph::ensure_protein_feature

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ranges::SeqInterval;

pub mod gene;
pub mod protein;
pub mod rna;
pub mod source;

pub use gene::GeneRef;
pub use protein::{ProtProcessing, ProtRef};
pub use rna::{RnaExt, RnaKind, RnaRef, TrnaExt};
pub use source::{BioSource, Genome, OrgMod, OrgModSubtype, OrgRef, Origin, SubSource, SubSourceSubtype};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DescriptorId(pub usize);

/// Identity of one annotation object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectId {
    Feature(FeatureId),
    Descriptor(DescriptorId),
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Feature(id) => write!(f, "feature:{}", id.0),
            ObjectId::Descriptor(id) => write!(f, "descriptor:{}", id.0),
        }
    }
}

impl From<FeatureId> for ObjectId {
    fn from(value: FeatureId) -> Self {
        ObjectId::Feature(value)
    }
}

impl From<DescriptorId> for ObjectId {
    fn from(value: DescriptorId) -> Self {
        ObjectId::Descriptor(value)
    }
}

/// Molecule type of a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Nucleotide,
    Protein,
}

/// A named key/value pair attached to a feature (a GenBank qualifier).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub key: String,
    pub value: String,
}

impl Qualifier {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Coding region payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdRegion {
    /// Reading frame, 1 to 3.
    #[serde(default = "default_frame")]
    pub frame: u8,
    #[serde(default)]
    pub genetic_code: Option<u8>,
}

fn default_frame() -> u8 {
    1
}

/// The kind-specific payload of a feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum FeatureData {
    Gene(GeneRef),
    Cds(CdRegion),
    Rna(RnaRef),
    Prot(ProtRef),
    Source(BioSource),
    Import { key: String },
}

impl FeatureData {
    /// The INSDC feature key.
    pub fn key(&self) -> &str {
        match self {
            FeatureData::Gene(_) => "gene",
            FeatureData::Cds(_) => "CDS",
            FeatureData::Rna(rna) => rna.kind.key(),
            FeatureData::Prot(prot) => prot.processed.key(),
            FeatureData::Source(_) => "source",
            FeatureData::Import { key } => key,
        }
    }
}

/// An annotation attached to an interval of a sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub seq_id: String,
    pub location: SeqInterval,
    pub data: FeatureData,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
    #[serde(default)]
    pub pseudo: bool,
    #[serde(default)]
    pub gene_xref: Option<GeneRef>,
    /// Id of the product sequence (the protein of a coding region).
    #[serde(default)]
    pub product: Option<String>,
}

impl Feature {
    pub fn new(id: FeatureId, seq_id: &str, location: SeqInterval, data: FeatureData) -> Self {
        Self {
            id,
            seq_id: seq_id.to_string(),
            location,
            data,
            comment: None,
            qualifiers: Vec::new(),
            pseudo: false,
            gene_xref: None,
            product: None,
        }
    }

    pub fn key(&self) -> &str {
        self.data.key()
    }

    pub fn is_gene(&self) -> bool {
        matches!(self.data, FeatureData::Gene(_))
    }

    pub fn is_cds(&self) -> bool {
        matches!(self.data, FeatureData::Cds(_))
    }

    pub fn is_mrna(&self) -> bool {
        matches!(&self.data, FeatureData::Rna(rna) if rna.kind == RnaKind::Mrna)
    }

    /// Whether this feature or its gene (by payload or cross-reference) is
    /// marked pseudo.
    pub fn is_pseudo(&self) -> bool {
        if self.pseudo {
            return true;
        }
        match &self.data {
            FeatureData::Gene(gene) => gene.pseudo,
            _ => self.gene_xref.as_ref().map_or(false, |xref| xref.pseudo),
        }
    }

    /// The gene data carried by this feature: its own payload for genes,
    /// the gene cross-reference otherwise.
    pub fn gene_data(&self) -> Option<&GeneRef> {
        match &self.data {
            FeatureData::Gene(gene) => Some(gene),
            _ => self.gene_xref.as_ref(),
        }
    }

    pub fn gene_data_mut(&mut self) -> Option<&mut GeneRef> {
        match &mut self.data {
            FeatureData::Gene(gene) => Some(gene),
            _ => self.gene_xref.as_mut(),
        }
    }

    /// Values of all qualifiers with this key, in order.
    pub fn qualifier_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.qualifiers
            .iter()
            .filter(move |q| q.key.eq_ignore_ascii_case(key))
            .map(|q| q.value.as_str())
    }

    /// A short human-readable name for this feature.
    pub fn label(&self) -> String {
        let name = match &self.data {
            FeatureData::Gene(gene) => gene.label(),
            FeatureData::Rna(rna) => rna.name(),
            FeatureData::Prot(prot) => prot.names.first().cloned(),
            FeatureData::Source(biosrc) => biosrc.org.taxname.clone(),
            FeatureData::Cds(_) | FeatureData::Import { .. } => None,
        };
        match name {
            Some(name) if !name.is_empty() => name,
            _ => self.key().to_string(),
        }
    }

    /// Every text-bearing value on this feature, label excluded.
    pub fn text_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = Vec::new();
        if let Some(comment) = &self.comment {
            values.push(comment);
        }
        values.extend(self.qualifiers.iter().map(|q| q.value.as_str()));
        match &self.data {
            FeatureData::Gene(gene) => values.extend(gene.text_values()),
            FeatureData::Rna(rna) => values.extend(rna.text_values()),
            FeatureData::Prot(prot) => values.extend(prot.text_values()),
            FeatureData::Source(biosrc) => values.extend(biosrc.text_values()),
            FeatureData::Cds(_) | FeatureData::Import { .. } => {}
        }
        if let Some(xref) = &self.gene_xref {
            values.extend(xref.text_values());
        }
        values
    }
}

/// The payload of a record-level annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum DescriptorData {
    Source(BioSource),
    Title { text: String },
    Comment { text: String },
}

/// A record-level annotation, not anchored to an interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: DescriptorId,
    /// The sequence this descriptor is attached to; `None` for set-level
    /// descriptors.
    #[serde(default)]
    pub seq_id: Option<String>,
    pub data: DescriptorData,
}

impl Descriptor {
    pub fn label(&self) -> String {
        match &self.data {
            DescriptorData::Source(biosrc) => biosrc
                .org
                .taxname
                .clone()
                .unwrap_or_else(|| "source".to_string()),
            DescriptorData::Title { .. } => "title".to_string(),
            DescriptorData::Comment { .. } => "comment".to_string(),
        }
    }

    pub fn text_values(&self) -> Vec<&str> {
        match &self.data {
            DescriptorData::Source(biosrc) => biosrc.text_values(),
            DescriptorData::Title { text } | DescriptorData::Comment { text } => vec![text],
        }
    }

    pub fn biosource(&self) -> Option<&BioSource> {
        match &self.data {
            DescriptorData::Source(biosrc) => Some(biosrc),
            _ => None,
        }
    }
}

/// The object kinds a traversal can be asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Gene,
    Cds,
    /// RNA features, optionally restricted to one RNA kind.
    Rna(Option<RnaKind>),
    /// Import features, optionally restricted to one feature key.
    Import(Option<String>),
    SourceFeature,
    SourceDescriptor,
    /// Any non-gene feature whose gene cross-reference names a gene.
    GeneXref,
}

impl ObjectKind {
    pub fn matches_feature(&self, feature: &Feature) -> bool {
        match (self, &feature.data) {
            (ObjectKind::Gene, FeatureData::Gene(_)) => true,
            (ObjectKind::Cds, FeatureData::Cds(_)) => true,
            (ObjectKind::Rna(None), FeatureData::Rna(_)) => true,
            (ObjectKind::Rna(Some(kind)), FeatureData::Rna(rna)) => rna.kind == *kind,
            (ObjectKind::Import(None), FeatureData::Import { .. }) => true,
            (ObjectKind::Import(Some(wanted)), FeatureData::Import { key }) => {
                wanted.eq_ignore_ascii_case(key)
            }
            (ObjectKind::SourceFeature, FeatureData::Source(_)) => true,
            (ObjectKind::GeneXref, data) => {
                !matches!(data, FeatureData::Gene(_))
                    && feature.gene_xref.as_ref().map_or(false, |xref| !xref.is_suppressor())
            }
            _ => false,
        }
    }

    pub fn matches_descriptor(&self, descriptor: &Descriptor) -> bool {
        matches!(
            (self, &descriptor.data),
            (ObjectKind::SourceDescriptor, DescriptorData::Source(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::Strand;

    fn cds_with_xref() -> Feature {
        let mut cds = Feature::new(
            FeatureId(1),
            "chr1",
            SeqInterval::new(10, 99, Strand::Plus),
            FeatureData::Cds(CdRegion::default()),
        );
        cds.gene_xref = Some(GeneRef {
            locus: Some("abcA".to_string()),
            ..Default::default()
        });
        cds.comment = Some("partial sequence".to_string());
        cds.qualifiers.push(Qualifier::new("note", "see figure 2"));
        cds
    }

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::Feature(FeatureId(4)).to_string(), "feature:4");
        assert_eq!(ObjectId::Descriptor(DescriptorId(0)).to_string(), "descriptor:0");
    }

    #[test]
    fn test_gene_data_through_xref() {
        let cds = cds_with_xref();
        assert_eq!(cds.gene_data().and_then(|g| g.locus.as_deref()), Some("abcA"));
        assert!(!cds.is_pseudo());
    }

    #[test]
    fn test_text_values() {
        let cds = cds_with_xref();
        let values = cds.text_values();
        assert!(values.contains(&"partial sequence"));
        assert!(values.contains(&"see figure 2"));
        assert!(values.contains(&"abcA"));
        assert_eq!(cds.label(), "CDS");
    }

    #[test]
    fn test_object_kind_matching() {
        let cds = cds_with_xref();
        assert!(ObjectKind::Cds.matches_feature(&cds));
        assert!(ObjectKind::GeneXref.matches_feature(&cds));
        assert!(!ObjectKind::Gene.matches_feature(&cds));
        assert!(!ObjectKind::Rna(None).matches_feature(&cds));

        let mut suppressed = cds_with_xref();
        suppressed.gene_xref = Some(GeneRef::default());
        assert!(!ObjectKind::GeneXref.matches_feature(&suppressed));
    }
}
