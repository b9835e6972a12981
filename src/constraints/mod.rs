//! Constraint evaluation.
//!
//! A [`FilterSet`] combines up to four predicates over a target: a string
//! constraint over any of its text, a choice constraint, a location
//! constraint and a coding-region cluster constraint. A target passes when
//! every present predicate passes. All evaluation here is read-only.

use serde::{Deserialize, Serialize};

use crate::{
    cdset::CdSet,
    fields::{FieldRef, Target},
    graph::AnnotationGraph,
    model::ObjectId,
};

pub mod choice;
pub mod location;
pub mod string;

use choice::{matches_choice, ChoiceConstraint};
use location::{matches_location, LocationConstraint};
use string::StringConstraint;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Matched against every text value of the target.
    #[serde(default)]
    pub string: Option<StringConstraint>,
    #[serde(default)]
    pub choice: Option<ChoiceConstraint>,
    #[serde(default)]
    pub location: Option<LocationConstraint>,
    /// Evaluated against the target's coding-region cluster; an object
    /// target is treated as a cluster of its own.
    #[serde(default)]
    pub cgp: Option<ChoiceConstraint>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(mut self, constraint: StringConstraint) -> Self {
        self.string = Some(constraint);
        self
    }

    pub fn with_choice(mut self, constraint: ChoiceConstraint) -> Self {
        self.choice = Some(constraint);
        self
    }

    pub fn with_location(mut self, constraint: LocationConstraint) -> Self {
        self.location = Some(constraint);
        self
    }

    pub fn with_cgp(mut self, constraint: ChoiceConstraint) -> Self {
        self.cgp = Some(constraint);
        self
    }

    /// The member ids of a target.
    fn target_ids(target: &Target) -> Vec<ObjectId> {
        match target {
            Target::Object(id) => vec![*id],
            Target::Cluster(set) => set.members().into_iter().map(ObjectId::Feature).collect(),
        }
    }

    fn accepts_location(&self, graph: &AnnotationGraph, target: &Target) -> bool {
        let Some(location) = &self.location else {
            return true;
        };
        Self::target_ids(target).into_iter().any(|id| {
            graph
                .context(id)
                .map_or(false, |context| matches_location(&context, location))
        })
    }

    fn accepts_string(&self, graph: &AnnotationGraph, target: &Target) -> bool {
        let Some(constraint) = self.string.as_ref().filter(|c| !c.is_empty()) else {
            return true;
        };
        let positive = constraint.positive();
        let found = Self::target_ids(target)
            .into_iter()
            .any(|id| graph.any_text(id, |text| positive.matches(text)));
        found != constraint.negate
    }

    fn accepts_cgp(&self, graph: &AnnotationGraph, target: &Target) -> bool {
        let Some(cgp) = &self.cgp else {
            return true;
        };
        match target {
            Target::Cluster(_) => matches_choice(graph, target, cgp),
            Target::Object(ObjectId::Feature(fid)) => {
                let cluster = Target::Cluster(CdSet::singleton(graph, *fid));
                matches_choice(graph, &cluster, cgp)
            }
            Target::Object(ObjectId::Descriptor(_)) => false,
        }
    }

    /// Whether `target` passes every constraint present.
    ///
    /// Cheap checks run first; an absent constraint accepts everything.
    pub fn accepts(&self, graph: &AnnotationGraph, target: &Target) -> bool {
        self.accepts_location(graph, target)
            && self.accepts_string(graph, target)
            && self
                .choice
                .as_ref()
                .map_or(true, |choice| matches_choice(graph, target, choice))
            && self.accepts_cgp(graph, target)
    }

    /// The string constraint selecting among the values of `field`, if the
    /// choice constraint is a non-negated string match on that field.
    pub fn field_filter(&self, field: &FieldRef) -> Option<&StringConstraint> {
        match &self.choice {
            Some(ChoiceConstraint::StringMatch {
                field: Some(f),
                constraint,
            }) if f == field && !constraint.negate && !constraint.is_empty() => Some(constraint),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraints::location::LocationRelation,
        model::FeatureId,
        test_utilities::{graph_test_case_01, CASE_01_SEQ},
    };

    fn genes(graph: &AnnotationGraph) -> Vec<FeatureId> {
        graph.features().filter(|f| f.is_gene()).map(|f| f.id).collect()
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let graph = graph_test_case_01();
        let filter = FilterSet::default();
        for feature in graph.features() {
            assert!(filter.accepts(&graph, &Target::Object(feature.id.into())));
        }
    }

    #[test]
    fn test_location_filter() {
        let graph = graph_test_case_01();
        let filter = FilterSet::new()
            .with_location(LocationConstraint::new(LocationRelation::Contained, 100, 200));
        let accepted: Vec<_> = genes(&graph)
            .into_iter()
            .filter(|id| filter.accepts(&graph, &Target::Object((*id).into())))
            .collect();
        for id in &accepted {
            let f = graph.feature(*id).unwrap();
            assert_eq!(f.seq_id, CASE_01_SEQ);
            assert!(f.location.start >= 100 && f.location.stop <= 200);
        }
        assert!(!accepted.is_empty());
    }

    #[test]
    fn test_string_filter_negation() {
        let graph = graph_test_case_01();
        let positive = FilterSet::new().with_string(StringConstraint::contains("abcA"));
        let negative =
            FilterSet::new().with_string(StringConstraint::contains("abcA").negated(true));
        for id in genes(&graph) {
            let target = Target::Object(id.into());
            assert_ne!(
                positive.accepts(&graph, &target),
                negative.accepts(&graph, &target)
            );
        }
    }

    #[test]
    fn test_field_filter() {
        let field: FieldRef = "gene.synonym".parse().unwrap();
        let filter = FilterSet::new().with_choice(ChoiceConstraint::string_match(
            Some(field.clone()),
            StringConstraint::contains("old"),
        ));
        assert!(filter.field_filter(&field).is_some());
        assert!(filter.field_filter(&"gene.locus".parse().unwrap()).is_none());

        let negated = FilterSet::new().with_choice(ChoiceConstraint::string_match(
            Some(field.clone()),
            StringConstraint::contains("old").negated(true),
        ));
        assert!(negated.field_filter(&field).is_none());
    }
}
