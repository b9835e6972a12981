//! # AECR: constrained field transformations over sequence annotations
//!
//! This library implements the Apply / Edit / Convert / Swap / Parse / Remove
//! ("AECR") engine: one of six verbs is performed against one *field kind*
//! (gene fields, RNA fields, coding region comments, protein fields, source
//! qualifiers, import qualifiers) across every annotation object that passes
//! a [`FilterSet`].
//!
//! The pieces, leaves first:
//!
//!  1. [`fields`]: the field accessor registry. Every [`FieldRef`] resolves
//!     to a [`FieldAccessor`] with `get`/`set`/`remove`.
//!  2. [`constraints`]: string, location and choice constraints, combined
//!     into a [`FilterSet`].
//!  3. [`conflict`]: the [`GetSample`] dry run and the existing-text merge
//!     policy.
//!  4. [`cdset`]: clustering of gene, mRNA, coding region and protein
//!     features into [`CdSet`]s.
//!  5. [`dispatch`]: the [`AecrEngine`], which runs one verb end to end.
//!
//! The annotation graph ([`AnnotationGraph`]) is only ever borrowed for the
//! duration of one operation.
//!
//! [`FilterSet`]: crate::constraints::FilterSet
//! [`FieldRef`]: crate::fields::FieldRef
//! [`FieldAccessor`]: crate::traits::FieldAccessor
//! [`GetSample`]: crate::conflict::GetSample
//! [`CdSet`]: crate::cdset::CdSet
//! [`AecrEngine`]: crate::dispatch::AecrEngine
//! [`AnnotationGraph`]: crate::graph::AnnotationGraph

pub mod cdset;
pub mod commands;
pub mod conflict;
pub mod constraints;
pub mod dispatch;
pub mod error;
pub mod fields;
pub mod graph;
pub mod model;
pub mod portion;
pub mod ranges;
pub mod reporting;
pub mod test_utilities;
pub mod traits;

/// 0-based sequence coordinate.
pub type Position = u32;

pub mod prelude {
    pub use crate::cdset::{build_cdsets, matching_cdsets, CdSet};
    pub use crate::conflict::{
        merge, ApplyValue, CancelOnConflict, Delimiter, EditLocation, ExistingTextPolicy,
        FixedPolicy, GetSample,
    };
    pub use crate::constraints::{
        choice::{ChoiceConstraint, PseudoFeatureKind},
        location::{
            LocationAnchor, LocationConstraint, LocationRelation, SequenceType, StrandFilter,
        },
        string::{matches_string, MatchLocation, StringConstraint},
        FilterSet,
    };
    pub use crate::dispatch::{
        Action, ActionSummary, AecrEngine, AecrRequest, ConvertFieldSpec, ConvertMode, Verb,
    };
    pub use crate::error::AecrError;
    pub use crate::fields::{FieldRef, Target};
    pub use crate::graph::{AnnotationGraph, GraphTraversal, Scope};
    pub use crate::model::{
        Descriptor, DescriptorData, DescriptorId, Feature, FeatureData, FeatureId, ObjectId,
        Qualifier, SequenceKind,
    };
    pub use crate::portion::{extract, LeftMode, RightMode, TextPortion};
    pub use crate::ranges::{SeqInterval, Strand};
    pub use crate::reporting::{CommandOutput, Report};
    pub use crate::traits::{ConflictDecider, DirtyNotifier, FieldAccessor, ObjectTraversal};
}
