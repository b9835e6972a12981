//! Cluster fields (`cgp.*`): one field of one member kind of a
//! coding-region cluster, delegated to that kind's own accessor.
//!
//! `get` returns the first member's value; `set` and `remove` act on every
//! member of the kind. An object target is treated as a cluster of its own.

use super::{
    cds::CdsCommentAccessor, gene::GeneAccessor, protein::ProteinAccessor, rna::RnaAccessor,
    CgpField, FieldRef, Target,
};
use crate::{
    cdset::CdSet,
    conflict::{ApplyValue, GetSample},
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{FeatureData, FeatureId, ObjectId, RnaKind},
    traits::FieldAccessor,
};
use tracing::debug;

pub struct CgpAccessor {
    field: FieldRef,
    which: CgpField,
    inner: Box<dyn FieldAccessor>,
}

impl CgpAccessor {
    pub fn new(which: CgpField) -> Self {
        let inner: Box<dyn FieldAccessor> = match which {
            CgpField::Gene(field) => Box::new(GeneAccessor::new(field)),
            CgpField::Mrna(field) => Box::new(RnaAccessor::new(Some(RnaKind::Mrna), field)),
            CgpField::CdsComment => Box::new(CdsCommentAccessor::new()),
            CgpField::Protein(field) | CgpField::MatPeptide(field) => {
                Box::new(ProteinAccessor::new(field))
            }
        };
        Self {
            field: FieldRef::CdsGeneProt(which),
            which,
            inner,
        }
    }

    fn cluster(graph: &AnnotationGraph, target: &Target) -> CdSet {
        match target {
            Target::Cluster(set) => set.clone(),
            Target::Object(ObjectId::Feature(fid)) => CdSet::singleton(graph, *fid),
            Target::Object(ObjectId::Descriptor(_)) => CdSet::default(),
        }
    }

    /// The member features the inner accessor acts on.
    fn destinations(&self, graph: &AnnotationGraph, set: &CdSet) -> Vec<FeatureId> {
        let is_prot = |id: &&FeatureId, mature: bool| match graph.feature(**id).map(|f| &f.data) {
            Some(FeatureData::Prot(prot)) if mature => prot.is_mature_peptide(),
            Some(FeatureData::Prot(prot)) => prot.is_full_length(),
            _ => false,
        };
        match self.which {
            CgpField::Gene(_) => set.gene.clone(),
            CgpField::Mrna(_) => set.mrna.clone(),
            CgpField::CdsComment => set.cds.clone(),
            // through the coding region, so a missing protein feature can be created
            CgpField::Protein(_) if !set.cds.is_empty() => set.cds.clone(),
            CgpField::Protein(_) => set.prot.iter().filter(|id| is_prot(id, false)).copied().collect(),
            CgpField::MatPeptide(_) => set.prot.iter().filter(|id| is_prot(id, true)).copied().collect(),
        }
    }

    /// Write every member, skipping the ones that fail. The cluster only
    /// fails when no member changed and at least one member failed.
    fn for_each_member<F>(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        mut write: F,
    ) -> Result<bool, AecrError>
    where
        F: FnMut(&mut AnnotationGraph, &Target) -> Result<bool, AecrError>,
    {
        let mut changed = false;
        let mut first_error = None;
        for member in self.targets(graph, target) {
            match write(graph, &member) {
                Ok(member_changed) => changed |= member_changed,
                Err(err) => {
                    debug!("{}: skipping member {}: {}", self.field, member, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) if !changed => Err(err),
            _ => Ok(changed),
        }
    }

    fn targets(&self, graph: &AnnotationGraph, target: &Target) -> Vec<Target> {
        let set = Self::cluster(graph, target);
        self.destinations(graph, &set)
            .into_iter()
            .map(|id| Target::Object(ObjectId::Feature(id)))
            .collect()
    }
}

impl FieldAccessor for CgpAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        self.targets(graph, target)
            .iter()
            .find_map(|member| self.inner.get(graph, member, filter))
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        self.for_each_member(graph, target, |graph, member| {
            self.inner.set(graph, member, value, filter)
        })
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        self.for_each_member(graph, target, |graph, member| self.inner.remove(graph, member))
    }

    /// Samples each destination member separately.
    fn sample(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
        sample: &mut GetSample,
    ) {
        for member in self.targets(graph, target) {
            self.inner.sample(graph, &member, filter, sample);
        }
    }
}
