//! Gene fields.
//!
//! On gene features these read the gene payload. On any other feature they
//! follow the gene cross-reference: to the gene feature it names when that
//! gene is annotated, otherwise to the cross-reference itself. The comment
//! is the gene feature's own comment and is not available on a bare
//! cross-reference.

use super::{list_get, list_remove, list_set, set_flag, set_single, unsupported, every, get_single};
use super::{FieldRef, GeneField, NamedField, Target};
use crate::{
    conflict::ApplyValue,
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{Feature, FeatureId, GeneRef, ObjectId},
    traits::FieldAccessor,
};

pub struct GeneAccessor {
    field: FieldRef,
    which: GeneField,
}

impl GeneAccessor {
    pub fn new(which: GeneField) -> Self {
        Self {
            field: FieldRef::Gene(which),
            which,
        }
    }

    /// The feature holding the gene payload for `target`.
    fn resolve(graph: &AnnotationGraph, target: &Target) -> Option<FeatureId> {
        let fid = target.feature_id()?;
        Some(graph.xref_gene(fid).unwrap_or(fid))
    }

    fn feature_mut<'a>(
        &self,
        graph: &'a mut AnnotationGraph,
        target: &Target,
    ) -> Result<&'a mut Feature, AecrError> {
        Self::resolve(graph, target)
            .and_then(|fid| graph.feature_mut(fid))
            .ok_or_else(|| unsupported(&self.field, target))
    }

    fn single_slot<'a>(&self, gene: &'a mut GeneRef) -> Option<&'a mut Option<String>> {
        match self.which {
            GeneField::Locus => Some(&mut gene.locus),
            GeneField::Description => Some(&mut gene.desc),
            GeneField::Allele => Some(&mut gene.allele),
            GeneField::Maploc => Some(&mut gene.maploc),
            GeneField::LocusTag => Some(&mut gene.locus_tag),
            GeneField::Synonym | GeneField::Comment | GeneField::Pseudo => None,
        }
    }
}

impl FieldAccessor for GeneAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        let feature = graph.feature(Self::resolve(graph, target)?)?;
        if self.which == GeneField::Comment {
            return feature
                .is_gene()
                .then(|| get_single(feature.comment.as_deref(), filter))
                .flatten();
        }
        let gene = feature.gene_data()?;
        match self.which {
            GeneField::Locus => get_single(gene.locus.as_deref(), filter),
            GeneField::Description => get_single(gene.desc.as_deref(), filter),
            GeneField::Allele => get_single(gene.allele.as_deref(), filter),
            GeneField::Maploc => get_single(gene.maploc.as_deref(), filter),
            GeneField::LocusTag => get_single(gene.locus_tag.as_deref(), filter),
            GeneField::Synonym => list_get(&gene.synonyms, every, filter),
            GeneField::Pseudo => get_single(gene.pseudo.then_some(self.which.name()), filter),
            GeneField::Comment => None,
        }
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        let feature = self.feature_mut(graph, target)?;
        if self.which == GeneField::Comment {
            if !feature.is_gene() {
                return Err(unsupported(&self.field, target));
            }
            return Ok(set_single(&mut feature.comment, value, filter));
        }
        let gene = feature
            .gene_data_mut()
            .ok_or_else(|| unsupported(&self.field, target))?;
        match self.which {
            GeneField::Synonym => list_set(&mut gene.synonyms, every, |v| v, value, filter, &self.field),
            GeneField::Pseudo => {
                if filter.map_or(false, |f| !f.matches(self.which.name())) {
                    return Ok(false);
                }
                Ok(set_flag(&mut gene.pseudo, self.which.name(), value))
            }
            _ => match self.single_slot(gene) {
                Some(slot) => Ok(set_single(slot, value, filter)),
                None => Err(unsupported(&self.field, target)),
            },
        }
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let feature = self.feature_mut(graph, target)?;
        if self.which == GeneField::Comment {
            if !feature.is_gene() {
                return Err(unsupported(&self.field, target));
            }
            return Ok(feature.comment.take().is_some());
        }
        let gene = feature
            .gene_data_mut()
            .ok_or_else(|| unsupported(&self.field, target))?;
        let changed = match self.which {
            GeneField::Synonym => list_remove(&mut gene.synonyms, every),
            GeneField::Pseudo => std::mem::take(&mut gene.pseudo),
            _ => self
                .single_slot(gene)
                .map_or(false, |slot| slot.take().is_some()),
        };
        Ok(changed)
    }

    fn destination(&self, graph: &AnnotationGraph, target: &Target) -> Option<ObjectId> {
        Self::resolve(graph, target).map(ObjectId::Feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conflict::{Delimiter, ExistingTextPolicy},
        model::{FeatureData, FeatureId, ObjectId},
        test_utilities::graph_test_case_01,
    };

    fn find_gene(graph: &AnnotationGraph, locus: &str) -> Target {
        let feature = graph
            .features()
            .find(|f| f.is_gene() && f.gene_data().and_then(|g| g.locus.as_deref()) == Some(locus))
            .unwrap();
        Target::Object(ObjectId::Feature(feature.id))
    }

    #[test]
    fn test_get_set_locus() {
        let mut graph = graph_test_case_01();
        let target = find_gene(&graph, "abcA");
        let accessor = GeneAccessor::new(GeneField::Locus);
        assert_eq!(accessor.get(&graph, &target, None), Some("abcA".to_string()));

        let append = ApplyValue::new("2").with_policy(ExistingTextPolicy::Append(Delimiter::None));
        assert!(accessor.set(&mut graph, &target, &append, None).unwrap());
        assert_eq!(accessor.get(&graph, &target, None), Some("abcA2".to_string()));

        // unchanged value is not a change
        let same = ApplyValue::new("abcA2");
        assert!(!accessor.set(&mut graph, &target, &same, None).unwrap());
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut graph = graph_test_case_01();
        let target = find_gene(&graph, "abcA");
        let accessor = GeneAccessor::new(GeneField::Allele);
        assert_eq!(accessor.get(&graph, &target, None), None);
        assert!(!accessor.remove(&mut graph, &target).unwrap());

        assert!(accessor.set(&mut graph, &target, &ApplyValue::new("a1"), None).unwrap());
        assert!(accessor.remove(&mut graph, &target).unwrap());
        assert_eq!(accessor.get(&graph, &target, None), None);
    }

    #[test]
    fn test_xref_is_edited_on_non_gene_features() {
        let mut graph = graph_test_case_01();
        let cds = graph
            .features()
            .find(|f| f.is_cds() && f.gene_xref.is_some())
            .map(|f| f.id)
            .unwrap();
        let target = Target::Object(ObjectId::Feature(cds));
        let accessor = GeneAccessor::new(GeneField::Locus);
        assert!(accessor.get(&graph, &target, None).is_some());
        assert!(accessor.set(&mut graph, &target, &ApplyValue::new("newX"), None).unwrap());
        let xref = graph.feature(cds).unwrap().gene_xref.as_ref().unwrap();
        assert_eq!(xref.locus.as_deref(), Some("newX"));

        // comments never go through the cross-reference
        let comment = GeneAccessor::new(GeneField::Comment);
        let result = comment.set(&mut graph, &target, &ApplyValue::new("x"), None);
        assert!(matches!(result, Err(AecrError::FieldUnsupportedForKind { .. })));
    }

    #[test]
    fn test_xref_naming_an_annotated_gene_reaches_it() {
        let mut graph = graph_test_case_01();
        let gene = find_gene(&graph, "abcA");
        let mrna = graph.features().find(|f| f.is_mrna()).map(|f| f.id).unwrap();
        graph.feature_mut(mrna).unwrap().gene_xref = Some(GeneRef {
            locus: Some("abcA".to_string()),
            ..Default::default()
        });
        let target = Target::Object(ObjectId::Feature(mrna));
        let accessor = GeneAccessor::new(GeneField::Description);
        assert_eq!(accessor.destination(&graph, &target), gene.primary_id());

        assert!(accessor.set(&mut graph, &target, &ApplyValue::new("transporter"), None).unwrap());
        assert_eq!(accessor.get(&graph, &gene, None), Some("transporter".to_string()));
        let xref = graph.feature(mrna).unwrap().gene_xref.as_ref().unwrap();
        assert_eq!(xref.desc, None);
    }

    #[test]
    fn test_unsupported_without_gene_data() {
        let mut graph = graph_test_case_01();
        let source = graph
            .features()
            .find(|f| matches!(f.data, FeatureData::Source(_)))
            .map(|f| f.id)
            .unwrap();
        let target = Target::Object(ObjectId::Feature(source));
        let accessor = GeneAccessor::new(GeneField::Locus);
        assert_eq!(accessor.get(&graph, &target, None), None);
        let result = accessor.set(&mut graph, &target, &ApplyValue::new("x"), None);
        assert!(matches!(result, Err(AecrError::FieldUnsupportedForKind { .. })));

        let missing = Target::Object(ObjectId::Feature(FeatureId(9999)));
        assert!(accessor.remove(&mut graph, &missing).is_err());
    }

    #[test]
    fn test_pseudo_flag() {
        let mut graph = graph_test_case_01();
        let target = find_gene(&graph, "abcA");
        let accessor = GeneAccessor::new(GeneField::Pseudo);
        assert_eq!(accessor.get(&graph, &target, None), None);
        assert!(accessor.set(&mut graph, &target, &ApplyValue::new("true"), None).unwrap());
        assert_eq!(accessor.get(&graph, &target, None), Some("pseudo".to_string()));
        assert!(accessor.remove(&mut graph, &target).unwrap());
        assert_eq!(accessor.get(&graph, &target, None), None);
    }

    #[test]
    fn test_synonym_filter() {
        let mut graph = graph_test_case_01();
        let target = find_gene(&graph, "abcB");
        let accessor = GeneAccessor::new(GeneField::Synonym);
        let filter = StringConstraint::contains("old");
        assert_eq!(accessor.get(&graph, &target, Some(&filter)), Some("oldB".to_string()));
        assert!(accessor
            .set(&mut graph, &target, &ApplyValue::edit("old", "former"), Some(&filter))
            .unwrap());
        assert_eq!(accessor.get(&graph, &target, None), Some("formerB".to_string()));
    }
}
