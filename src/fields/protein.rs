//! Protein fields.
//!
//! A target may be a protein feature itself, or a coding region, in which
//! case the full-length protein feature on its product sequence is used.
//! Writing to a coding region whose product has no protein feature yet
//! creates an empty placeholder first; nothing is created when the write
//! would leave the field empty anyway.

use super::{
    every, get_single, list_get, list_remove, list_set, set_single, unsupported, FieldRef,
    ProteinField, Target,
};
use crate::{
    conflict::{ApplyValue, GetSample},
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{FeatureData, FeatureId, ObjectId},
    traits::FieldAccessor,
};

pub struct ProteinAccessor {
    field: FieldRef,
    which: ProteinField,
}

impl ProteinAccessor {
    pub fn new(which: ProteinField) -> Self {
        Self {
            field: FieldRef::Protein(which),
            which,
        }
    }

    /// The existing protein feature behind `target`.
    fn resolve(&self, graph: &AnnotationGraph, target: &Target) -> Option<FeatureId> {
        let fid = target.feature_id()?;
        match &graph.feature(fid)?.data {
            FeatureData::Prot(_) => Some(fid),
            FeatureData::Cds(_) => graph.product_protein_feature(fid),
            _ => None,
        }
    }

    /// The protein feature behind `target`, created if `target` is a coding
    /// region with a product but no protein feature.
    fn resolve_or_create(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
    ) -> Result<FeatureId, AecrError> {
        if let Some(fid) = self.resolve(graph, target) {
            return Ok(fid);
        }
        let fid = target
            .feature_id()
            .ok_or_else(|| unsupported(&self.field, target))?;
        let product = graph
            .feature(fid)
            .filter(|f| f.is_cds())
            .and_then(|_| graph.product_sequence(fid))
            .map(str::to_string)
            .ok_or_else(|| unsupported(&self.field, target))?;
        graph.ensure_protein_feature(&product)
    }

    fn write(
        &self,
        graph: &mut AnnotationGraph,
        prot_id: FeatureId,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
        target: &Target,
    ) -> Result<bool, AecrError> {
        let feature = graph
            .feature_mut(prot_id)
            .ok_or_else(|| unsupported(&self.field, target))?;
        if self.which == ProteinField::Comment {
            return Ok(set_single(&mut feature.comment, value, filter));
        }
        let FeatureData::Prot(prot) = &mut feature.data else {
            return Err(unsupported(&self.field, target));
        };
        match self.which {
            ProteinField::Name => list_set(&mut prot.names, every, |v| v, value, filter, &self.field),
            ProteinField::Description => Ok(set_single(&mut prot.desc, value, filter)),
            ProteinField::EcNumber => list_set(&mut prot.ec, every, |v| v, value, filter, &self.field),
            ProteinField::Activity => {
                list_set(&mut prot.activity, every, |v| v, value, filter, &self.field)
            }
            ProteinField::Comment => Ok(false),
        }
    }
}

impl FieldAccessor for ProteinAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        let feature = graph.feature(self.resolve(graph, target)?)?;
        if self.which == ProteinField::Comment {
            return get_single(feature.comment.as_deref(), filter);
        }
        let FeatureData::Prot(prot) = &feature.data else {
            return None;
        };
        match self.which {
            ProteinField::Name => list_get(&prot.names, every, filter),
            ProteinField::Description => get_single(prot.desc.as_deref(), filter),
            ProteinField::EcNumber => list_get(&prot.ec, every, filter),
            ProteinField::Activity => list_get(&prot.activity, every, filter),
            ProteinField::Comment => None,
        }
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        if self.resolve(graph, target).is_none() {
            // nothing to create if the field would stay empty
            match value.apply_to(None) {
                Some(new) if !new.is_empty() && filter.is_none() => {}
                _ => {
                    let fid = target.feature_id();
                    let known = fid.and_then(|fid| graph.feature(fid)).map_or(false, |f| {
                        matches!(f.data, FeatureData::Cds(_) | FeatureData::Prot(_))
                    });
                    return if known {
                        Ok(false)
                    } else {
                        Err(unsupported(&self.field, target))
                    };
                }
            }
        }
        let prot_id = self.resolve_or_create(graph, target)?;
        self.write(graph, prot_id, value, filter, target)
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let Some(prot_id) = self.resolve(graph, target) else {
            return match target.feature_id().and_then(|fid| graph.feature(fid)) {
                Some(f) if f.is_cds() => Ok(false),
                _ => Err(unsupported(&self.field, target)),
            };
        };
        let feature = graph
            .feature_mut(prot_id)
            .ok_or_else(|| unsupported(&self.field, target))?;
        if self.which == ProteinField::Comment {
            return Ok(feature.comment.take().is_some());
        }
        let FeatureData::Prot(prot) = &mut feature.data else {
            return Err(unsupported(&self.field, target));
        };
        let changed = match self.which {
            ProteinField::Name => list_remove(&mut prot.names, every),
            ProteinField::Description => prot.desc.take().is_some(),
            ProteinField::EcNumber => list_remove(&mut prot.ec, every),
            ProteinField::Activity => list_remove(&mut prot.activity, every),
            ProteinField::Comment => false,
        };
        Ok(changed)
    }

    /// Samples the protein feature, so several coding regions sharing one
    /// product are counted once.
    fn sample(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
        sample: &mut GetSample,
    ) {
        let id = self
            .resolve(graph, target)
            .map(ObjectId::Feature)
            .or_else(|| target.primary_id());
        if let Some(id) = id {
            sample.add(id, self.get(graph, target, filter));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{graph_test_case_01, CASE_01_BARE_PRODUCT};

    fn cds_with_product(graph: &AnnotationGraph, product: &str) -> Target {
        let fid = graph
            .features()
            .find(|f| f.is_cds() && f.product.as_deref() == Some(product))
            .map(|f| f.id)
            .unwrap();
        Target::Object(ObjectId::Feature(fid))
    }

    #[test]
    fn test_name_through_cds() {
        let mut graph = graph_test_case_01();
        let target = cds_with_product(&graph, "prot_abcB");
        let accessor = ProteinAccessor::new(ProteinField::Name);
        assert_eq!(
            accessor.get(&graph, &target, None),
            Some("hypothetical protein".to_string())
        );
        let edit = ApplyValue::edit("hypothetical", "putative");
        assert!(accessor.set(&mut graph, &target, &edit, None).unwrap());
        assert_eq!(
            accessor.get(&graph, &target, None),
            Some("putative protein".to_string())
        );
    }

    #[test]
    fn test_placeholder_created_on_write_only() {
        let mut graph = graph_test_case_01();
        let target = cds_with_product(&graph, CASE_01_BARE_PRODUCT);
        let accessor = ProteinAccessor::new(ProteinField::Name);
        let before = graph.num_features();

        assert_eq!(accessor.get(&graph, &target, None), None);
        assert!(!accessor.remove(&mut graph, &target).unwrap());
        assert!(!accessor
            .set(&mut graph, &target, &ApplyValue::edit("a", "b"), None)
            .unwrap());
        assert_eq!(graph.num_features(), before);

        assert!(accessor
            .set(&mut graph, &target, &ApplyValue::new("DNA ligase"), None)
            .unwrap());
        assert_eq!(graph.num_features(), before + 1);
        assert_eq!(accessor.get(&graph, &target, None), Some("DNA ligase".to_string()));
    }

    #[test]
    fn test_sample_counts_shared_product_once() {
        let graph = graph_test_case_01();
        let target = cds_with_product(&graph, "prot_abcB");
        let prot = graph.product_protein_feature(target.feature_id().unwrap()).unwrap();
        let accessor = ProteinAccessor::new(ProteinField::Name);
        let mut sample = GetSample::new();
        accessor.sample(&graph, &target, None, &mut sample);
        accessor.sample(&graph, &Target::Object(ObjectId::Feature(prot)), None, &mut sample);
        assert_eq!(sample.num_found, 1);
    }
}
