//! Choice constraints: qualifier presence, field string matches and the
//! pseudo flag.

use serde::{Deserialize, Serialize};

use crate::{
    cdset::CdSet,
    constraints::string::StringConstraint,
    fields::{FieldRef, Target},
    graph::AnnotationGraph,
    model::{FeatureId, ObjectId},
};

/// Which cluster members a pseudo-flag constraint inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PseudoFeatureKind {
    #[default]
    Any,
    Gene,
    Cds,
    Mrna,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoiceConstraint {
    #[default]
    Any,
    /// At least one of these fields holds a non-empty value.
    QualifierPresent(Vec<FieldRef>),
    /// `field` (or, without one, any text of the object) matches.
    StringMatch {
        #[serde(default)]
        field: Option<FieldRef>,
        constraint: StringConstraint,
    },
    /// The pseudo flag of the selected members equals `pseudo`.
    PseudoFlag {
        #[serde(default)]
        kind: PseudoFeatureKind,
        pseudo: bool,
    },
}

impl ChoiceConstraint {
    pub fn string_match(field: Option<FieldRef>, constraint: StringConstraint) -> Self {
        ChoiceConstraint::StringMatch { field, constraint }
    }
}

fn member_ids(set: &CdSet) -> Vec<ObjectId> {
    set.members().into_iter().map(ObjectId::Feature).collect()
}

fn any_member_text(graph: &AnnotationGraph, target: &Target, constraint: &StringConstraint) -> bool {
    let ids = match target {
        Target::Object(id) => vec![*id],
        Target::Cluster(set) => member_ids(set),
    };
    ids.into_iter()
        .any(|id| graph.any_text(id, |text| constraint.matches(text)))
}

fn pseudo_members<'a>(set: &'a CdSet, kind: PseudoFeatureKind) -> Vec<&'a FeatureId> {
    match kind {
        PseudoFeatureKind::Gene => set.gene.iter().collect(),
        PseudoFeatureKind::Cds => set.cds.iter().collect(),
        PseudoFeatureKind::Mrna => set.mrna.iter().collect(),
        PseudoFeatureKind::Any => set.gene.iter().chain(&set.cds).chain(&set.mrna).collect(),
    }
}

/// Whether `target` satisfies `constraint`.
pub fn matches_choice(graph: &AnnotationGraph, target: &Target, constraint: &ChoiceConstraint) -> bool {
    match constraint {
        ChoiceConstraint::Any => true,
        ChoiceConstraint::QualifierPresent(fields) => fields.iter().any(|field| {
            field
                .accessor()
                .get(graph, target, None)
                .map_or(false, |value| !value.is_empty())
        }),
        ChoiceConstraint::StringMatch { field, constraint } => {
            if constraint.is_empty() {
                return true;
            }
            let positive = constraint.positive();
            let found = match field {
                Some(field) => field.accessor().get(graph, target, Some(&positive)).is_some(),
                None => any_member_text(graph, target, &positive),
            };
            found != constraint.negate
        }
        ChoiceConstraint::PseudoFlag { kind, pseudo } => {
            let is_pseudo = match target {
                Target::Object(ObjectId::Feature(fid)) => {
                    graph.feature(*fid).map_or(false, |f| f.is_pseudo())
                }
                Target::Object(ObjectId::Descriptor(_)) => false,
                Target::Cluster(set) => pseudo_members(set, *kind)
                    .into_iter()
                    .filter_map(|fid| graph.feature(*fid))
                    .any(|f| f.is_pseudo()),
            };
            is_pseudo == *pseudo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraints::string::MatchLocation,
        test_utilities::{graph_test_case_01, CASE_01_PSEUDO_GENE},
    };

    fn gene_target(graph: &AnnotationGraph, locus: &str) -> Target {
        let id = graph
            .features()
            .find(|f| f.is_gene() && f.gene_data().and_then(|g| g.locus.as_deref()) == Some(locus))
            .map(|f| f.id)
            .unwrap();
        Target::Object(ObjectId::Feature(id))
    }

    #[test]
    fn test_string_match_on_field() {
        let graph = graph_test_case_01();
        let target = gene_target(&graph, "abcA");
        let field: FieldRef = "gene.locus".parse().unwrap();
        let hit = ChoiceConstraint::string_match(
            Some(field.clone()),
            StringConstraint::new("abc", MatchLocation::StartsWith),
        );
        assert!(matches_choice(&graph, &target, &hit));

        let miss = ChoiceConstraint::string_match(Some(field), StringConstraint::contains("xyz"));
        assert!(!matches_choice(&graph, &target, &miss));
    }

    #[test]
    fn test_negated_string_match() {
        let graph = graph_test_case_01();
        let target = gene_target(&graph, "abcA");
        let field: FieldRef = "gene.locus".parse().unwrap();
        let c = ChoiceConstraint::string_match(
            Some(field),
            StringConstraint::contains("abc").negated(true),
        );
        assert!(!matches_choice(&graph, &target, &c));
    }

    #[test]
    fn test_string_match_any_text() {
        let graph = graph_test_case_01();
        let target = gene_target(&graph, "abcA");
        let c = ChoiceConstraint::string_match(None, StringConstraint::contains("abcA"));
        assert!(matches_choice(&graph, &target, &c));
    }

    #[test]
    fn test_qualifier_present() {
        let graph = graph_test_case_01();
        let target = gene_target(&graph, "abcA");
        let present = ChoiceConstraint::QualifierPresent(vec![
            "gene.allele".parse().unwrap(),
            "gene.locus".parse().unwrap(),
        ]);
        assert!(matches_choice(&graph, &target, &present));
        let absent = ChoiceConstraint::QualifierPresent(vec!["gene.allele".parse().unwrap()]);
        assert!(!matches_choice(&graph, &target, &absent));
    }

    #[test]
    fn test_pseudo_flag() {
        let graph = graph_test_case_01();
        let pseudo = gene_target(&graph, CASE_01_PSEUDO_GENE);
        let normal = gene_target(&graph, "abcA");
        let c = ChoiceConstraint::PseudoFlag {
            kind: PseudoFeatureKind::Gene,
            pseudo: true,
        };
        assert!(matches_choice(&graph, &pseudo, &c));
        assert!(!matches_choice(&graph, &normal, &c));
    }
}
