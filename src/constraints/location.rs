//! Location constraints: strand, molecule type and interval relations.

use serde::{Deserialize, Serialize};

use crate::{
    graph::ObjectContext,
    model::SequenceKind,
    ranges::{SeqInterval, Strand},
    Position,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrandFilter {
    #[default]
    Any,
    /// Plus strand; objects with an unknown strand count as plus.
    Plus,
    Minus,
}

impl StrandFilter {
    pub fn accepts(&self, strand: Strand) -> bool {
        match self {
            StrandFilter::Any => true,
            StrandFilter::Plus => !strand.is_minus(),
            StrandFilter::Minus => strand.is_minus(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    #[default]
    Any,
    Nucleotide,
    Protein,
}

impl SequenceType {
    pub fn accepts(&self, kind: Option<SequenceKind>) -> bool {
        match self {
            SequenceType::Any => true,
            SequenceType::Nucleotide => kind == Some(SequenceKind::Nucleotide),
            SequenceType::Protein => kind == Some(SequenceKind::Protein),
        }
    }
}

/// Which end(s) of an object's interval a relation is tested against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationAnchor {
    /// The whole interval.
    #[default]
    Both,
    /// The 5' end only (the stop coordinate on the minus strand).
    Start,
    /// The 3' end only.
    Stop,
}

impl LocationAnchor {
    /// The (start, stop) the relation sees for `interval`.
    fn endpoints(&self, interval: &SeqInterval) -> (Position, Position) {
        match self {
            LocationAnchor::Both => (interval.start, interval.stop),
            LocationAnchor::Start => {
                let p = interval.five_prime();
                (p, p)
            }
            LocationAnchor::Stop => {
                let p = interval.three_prime();
                (p, p)
            }
        }
    }
}

/// The relation between an object's interval and the constraint's
/// `[left, right]` window. All intervals are closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationRelation {
    #[default]
    Any,
    /// Entirely before `left`.
    Upstream,
    /// Entirely after `left`.
    Downstream,
    Contained,
    NotContained,
    Overlaps,
    Equal,
}

impl LocationRelation {
    pub fn holds(&self, start: Position, stop: Position, left: Position, right: Position) -> bool {
        let contained = start >= left && stop <= right;
        match self {
            LocationRelation::Any => true,
            LocationRelation::Upstream => stop < left,
            LocationRelation::Downstream => start > left,
            LocationRelation::Contained => contained,
            LocationRelation::NotContained => !contained,
            LocationRelation::Overlaps => start <= right && stop >= left,
            LocationRelation::Equal => start == left && stop == right,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationConstraint {
    #[serde(default)]
    pub strand: StrandFilter,
    #[serde(default)]
    pub sequence_type: SequenceType,
    #[serde(default)]
    pub anchor: LocationAnchor,
    #[serde(default)]
    pub relation: LocationRelation,
    #[serde(default)]
    pub left: Position,
    #[serde(default)]
    pub right: Position,
}

impl LocationConstraint {
    pub fn new(relation: LocationRelation, left: Position, right: Position) -> Self {
        Self {
            relation,
            left,
            right,
            ..Default::default()
        }
    }

    pub fn on_strand(mut self, strand: StrandFilter) -> Self {
        self.strand = strand;
        self
    }

    pub fn on_sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.sequence_type = sequence_type;
        self
    }

    pub fn anchored_at(mut self, anchor: LocationAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Whether this constraint accepts everything.
    pub fn is_vacuous(&self) -> bool {
        self.strand == StrandFilter::Any
            && self.sequence_type == SequenceType::Any
            && self.relation == LocationRelation::Any
    }
}

/// Whether an object in `context` satisfies `constraint`.
///
/// Objects without an interval (set-level descriptors) only satisfy the
/// constraint if it places no strand or interval requirement on them.
pub fn matches_location(context: &ObjectContext, constraint: &LocationConstraint) -> bool {
    if !constraint.sequence_type.accepts(context.sequence_kind) {
        return false;
    }
    let Some(interval) = &context.interval else {
        return constraint.strand == StrandFilter::Any
            && constraint.relation == LocationRelation::Any;
    };
    if !constraint.strand.accepts(interval.strand) {
        return false;
    }
    let (start, stop) = constraint.anchor.endpoints(interval);
    constraint
        .relation
        .holds(start, stop, constraint.left, constraint.right)
}
