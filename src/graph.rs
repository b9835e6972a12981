//! The in-memory [`AnnotationGraph`] and its default traversal.
//!
//! The engine treats the graph as an externally-owned resource: it is
//! borrowed for one operation, read through field accessors and mutated
//! through field accessors. [`GraphTraversal`] is the default
//! [`ObjectTraversal`] over it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    constraints::FilterSet,
    error::AecrError,
    fields::Target,
    model::{
        Descriptor, DescriptorData, DescriptorId, Feature, FeatureData, FeatureId, ObjectId,
        ObjectKind, ProtRef, SequenceKind,
    },
    ranges::{validate_range, SeqInterval, Strand},
    traits::ObjectTraversal,
    Position,
};

/// A sequence in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bioseq {
    pub id: String,
    pub kind: SequenceKind,
    pub length: Position,
}

/// The genomic context a traversal supplies alongside each object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectContext {
    /// Location (with strand and partialness) of a feature, or the whole
    /// sequence for a descriptor; `None` for set-level descriptors.
    pub interval: Option<SeqInterval>,
    pub sequence_kind: Option<SequenceKind>,
}

/// Which sequences a traversal may visit.
///
/// The exclude set is prioritized over the retain set: a sequence listed in
/// both is skipped. Set-level descriptors (not attached to any sequence)
/// are only visited when no retain set is given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub retain: Option<HashSet<String>>,
    #[serde(default)]
    pub exclude: Option<HashSet<String>>,
}

impl Scope {
    /// A scope covering the whole graph.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn retain_seqnames(mut self, seqnames: &[String]) -> Self {
        self.retain = Some(seqnames.iter().cloned().collect());
        self
    }

    pub fn exclude_seqnames(mut self, seqnames: &[String]) -> Self {
        self.exclude = Some(seqnames.iter().cloned().collect());
        self
    }

    pub fn includes(&self, seq_id: Option<&str>) -> bool {
        match seq_id {
            None => self.retain.is_none(),
            Some(seq_id) => {
                if self
                    .exclude
                    .as_ref()
                    .map_or(false, |ex| ex.contains(seq_id))
                {
                    return false;
                }
                self.retain.as_ref().map_or(true, |rt| rt.contains(seq_id))
            }
        }
    }
}

/// The flat, serializable shape of an [`AnnotationGraph`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphRecord {
    pub sequences: Vec<Bioseq>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub descriptors: Vec<Descriptor>,
}

/// Sequences, features and descriptors, keyed by identity and kept in
/// insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct AnnotationGraph {
    sequences: IndexMap<String, Bioseq>,
    features: IndexMap<FeatureId, Feature>,
    descriptors: IndexMap<DescriptorId, Descriptor>,
    next_feature: usize,
    next_descriptor: usize,
}

impl AnnotationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sequence(&mut self, id: &str, kind: SequenceKind, length: Position) {
        self.sequences.insert(
            id.to_string(),
            Bioseq {
                id: id.to_string(),
                kind,
                length,
            },
        );
    }

    pub fn sequence(&self, id: &str) -> Option<&Bioseq> {
        self.sequences.get(id)
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Bioseq> {
        self.sequences.values()
    }

    /// Add a new feature, validating its location against its sequence.
    pub fn add_feature(
        &mut self,
        seq_id: &str,
        location: SeqInterval,
        data: FeatureData,
    ) -> Result<FeatureId, AecrError> {
        let id = FeatureId(self.next_feature);
        self.insert_feature(Feature::new(id, seq_id, location, data))
    }

    /// Insert a fully built feature. Its id is replaced by a fresh one if it
    /// collides with an existing feature.
    pub fn insert_feature(&mut self, mut feature: Feature) -> Result<FeatureId, AecrError> {
        let length = self
            .sequences
            .get(&feature.seq_id)
            .ok_or_else(|| AecrError::MissingSequence(feature.seq_id.clone()))?
            .length;
        validate_range(feature.location.start, feature.location.stop, length)?;
        if self.features.contains_key(&feature.id) {
            feature.id = FeatureId(self.next_feature);
        }
        let id = feature.id;
        self.next_feature = self.next_feature.max(id.0 + 1);
        self.features.insert(id, feature);
        Ok(id)
    }

    pub fn add_descriptor(
        &mut self,
        seq_id: Option<&str>,
        data: DescriptorData,
    ) -> Result<DescriptorId, AecrError> {
        let id = DescriptorId(self.next_descriptor);
        self.insert_descriptor(Descriptor {
            id,
            seq_id: seq_id.map(str::to_string),
            data,
        })
    }

    /// Insert a fully built descriptor. Its id is replaced by a fresh one if
    /// it collides with an existing descriptor.
    pub fn insert_descriptor(&mut self, mut descriptor: Descriptor) -> Result<DescriptorId, AecrError> {
        if let Some(seq_id) = &descriptor.seq_id {
            if !self.sequences.contains_key(seq_id) {
                return Err(AecrError::MissingSequence(seq_id.clone()));
            }
        }
        if self.descriptors.contains_key(&descriptor.id) {
            descriptor.id = DescriptorId(self.next_descriptor);
        }
        let id = descriptor.id;
        self.next_descriptor = self.next_descriptor.max(id.0 + 1);
        self.descriptors.insert(id, descriptor);
        Ok(id)
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.get_mut(&id)
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(&id)
    }

    pub fn descriptor_mut(&mut self, id: DescriptorId) -> Option<&mut Descriptor> {
        self.descriptors.get_mut(&id)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    /// Get the total number of features.
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Features annotated on one sequence.
    pub fn features_on<'a>(&'a self, seq_id: &'a str) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features.values().filter(move |f| f.seq_id == seq_id)
    }

    /// The genomic context of an object.
    pub fn context(&self, id: ObjectId) -> Option<ObjectContext> {
        match id {
            ObjectId::Feature(fid) => {
                let feature = self.feature(fid)?;
                Some(ObjectContext {
                    interval: Some(feature.location),
                    sequence_kind: self.sequence(&feature.seq_id).map(|seq| seq.kind),
                })
            }
            ObjectId::Descriptor(did) => {
                let descriptor = self.descriptor(did)?;
                let seq = descriptor
                    .seq_id
                    .as_deref()
                    .and_then(|seq_id| self.sequence(seq_id));
                Some(ObjectContext {
                    interval: seq.map(|seq| {
                        SeqInterval::new(0, seq.length.saturating_sub(1), Strand::Unknown)
                    }),
                    sequence_kind: seq.map(|seq| seq.kind),
                })
            }
        }
    }

    /// The full-length protein feature annotated on a protein sequence; the
    /// longest one if there are several.
    pub fn protein_feature(&self, protein_seq: &str) -> Option<FeatureId> {
        self.features_on(protein_seq)
            .filter(|f| matches!(&f.data, FeatureData::Prot(prot) if prot.is_full_length()))
            .max_by_key(|f| (f.location.stop - f.location.start, std::cmp::Reverse(f.id)))
            .map(|f| f.id)
    }

    /// Mature peptide features annotated on a protein sequence.
    pub fn mature_peptides(&self, protein_seq: &str) -> Vec<FeatureId> {
        self.features_on(protein_seq)
            .filter(|f| matches!(&f.data, FeatureData::Prot(prot) if prot.is_mature_peptide()))
            .map(|f| f.id)
            .collect()
    }

    /// The product protein sequence id of a coding region, if that
    /// sequence exists in the graph and is a protein.
    pub fn product_sequence(&self, feature: FeatureId) -> Option<&str> {
        let product = self.feature(feature)?.product.as_deref()?;
        self.sequence(product)
            .filter(|seq| seq.kind == SequenceKind::Protein)
            .map(|seq| seq.id.as_str())
    }

    /// The full-length protein feature of a coding region's product.
    pub fn product_protein_feature(&self, cds: FeatureId) -> Option<FeatureId> {
        let product = self.product_sequence(cds)?;
        self.protein_feature(product)
    }

    /// The annotated gene a feature's cross-reference names, on the same
    /// sequence.
    pub fn xref_gene(&self, feature: FeatureId) -> Option<FeatureId> {
        let feature = self.feature(feature).filter(|f| !f.is_gene())?;
        let xref = feature.gene_xref.as_ref().filter(|xref| !xref.is_suppressor())?;
        self.features_on(&feature.seq_id)
            .filter(|f| f.is_gene())
            .find(|gene| gene.gene_data().map_or(false, |g| g.refers_to(xref)))
            .map(|gene| gene.id)
    }

    /// The full-length protein feature of a protein sequence, synthesizing
    /// an empty placeholder covering the whole sequence if there is none.
    pub fn ensure_protein_feature(&mut self, protein_seq: &str) -> Result<FeatureId, AecrError> {
        if let Some(id) = self.protein_feature(protein_seq) {
            return Ok(id);
        }
        let seq = self
            .sequence(protein_seq)
            .ok_or_else(|| AecrError::MissingSequence(protein_seq.to_string()))?;
        if seq.length == 0 {
            return Err(AecrError::EmptySequence(protein_seq.to_string()));
        }
        let location = SeqInterval::new(0, seq.length - 1, Strand::Plus);
        let id = self.add_feature(protein_seq, location, FeatureData::Prot(ProtRef::default()))?;
        tracing::debug!("created placeholder protein feature {:?} on {}", id, protein_seq);
        Ok(id)
    }

    /// A short name for any object.
    pub fn label(&self, id: ObjectId) -> Option<String> {
        match id {
            ObjectId::Feature(fid) => self.feature(fid).map(Feature::label),
            ObjectId::Descriptor(did) => self.descriptor(did).map(Descriptor::label),
        }
    }

    /// Whether any text-bearing field of the object, or its label, satisfies
    /// `pred`. Coding regions also expose their product protein's text.
    /// Stops at the first hit.
    pub fn any_text<F>(&self, id: ObjectId, mut pred: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        match id {
            ObjectId::Feature(fid) => {
                let Some(feature) = self.feature(fid) else {
                    return false;
                };
                if pred(&feature.label()) || feature.text_values().into_iter().any(&mut pred) {
                    return true;
                }
                if feature.is_cds() {
                    if let Some(prot) = self.product_protein_feature(fid).and_then(|p| self.feature(p)) {
                        return prot.text_values().into_iter().any(&mut pred);
                    }
                }
                false
            }
            ObjectId::Descriptor(did) => {
                let Some(descriptor) = self.descriptor(did) else {
                    return false;
                };
                pred(&descriptor.label()) || descriptor.text_values().into_iter().any(&mut pred)
            }
        }
    }
}

impl TryFrom<GraphRecord> for AnnotationGraph {
    type Error = AecrError;

    fn try_from(value: GraphRecord) -> Result<Self, Self::Error> {
        let mut graph = AnnotationGraph::new();
        for seq in value.sequences {
            graph.add_sequence(&seq.id, seq.kind, seq.length);
        }
        for feature in value.features {
            graph.insert_feature(feature)?;
        }
        for descriptor in value.descriptors {
            graph.insert_descriptor(descriptor)?;
        }
        Ok(graph)
    }
}

impl From<AnnotationGraph> for GraphRecord {
    fn from(value: AnnotationGraph) -> Self {
        GraphRecord {
            sequences: value.sequences.into_values().collect(),
            features: value.features.into_values().collect(),
            descriptors: value.descriptors.into_values().collect(),
        }
    }
}

/// The default traversal: features first, in insertion order, then
/// descriptors.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphTraversal;

impl ObjectTraversal for GraphTraversal {
    fn for_each_matching(
        &self,
        graph: &AnnotationGraph,
        kinds: &[ObjectKind],
        scope: &Scope,
        filter: &FilterSet,
        visit: &mut dyn FnMut(ObjectId, &ObjectContext),
    ) {
        for feature in graph.features() {
            if !scope.includes(Some(&feature.seq_id))
                || !kinds.iter().any(|kind| kind.matches_feature(feature))
            {
                continue;
            }
            let id = ObjectId::Feature(feature.id);
            if filter.accepts(graph, &Target::Object(id)) {
                if let Some(context) = graph.context(id) {
                    visit(id, &context);
                }
            }
        }
        for descriptor in graph.descriptors() {
            if !scope.includes(descriptor.seq_id.as_deref())
                || !kinds.iter().any(|kind| kind.matches_descriptor(descriptor))
            {
                continue;
            }
            let id = ObjectId::Descriptor(descriptor.id);
            if filter.accepts(graph, &Target::Object(id)) {
                if let Some(context) = graph.context(id) {
                    visit(id, &context);
                }
            }
        }
    }
}
