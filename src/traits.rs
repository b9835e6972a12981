//! Traits used by the AECR library.
//!
//! These are the seams between the engine and its collaborators: field
//! accessors (one implementation per field kind), the object traversal, the
//! existing-text decision, and the dirty notification.

use crate::{
    conflict::{ApplyValue, ExistingTextPolicy, GetSample},
    constraints::{string::StringConstraint, FilterSet},
    error::AecrError,
    fields::Target,
    graph::{AnnotationGraph, ObjectContext, Scope},
    model::{ObjectId, ObjectKind},
    Position,
};

/// The [`GenericRange`] trait defines common functionality for closed
/// intervals.
pub trait GenericRange: Clone {
    fn start(&self) -> Position;
    /// The last covered position (inclusive).
    fn end(&self) -> Position;
    fn width(&self) -> Position {
        self.end() - self.start() + 1
    }
    /// Whether `other` lies completely inside this range.
    fn contains_range<R: GenericRange>(&self, other: &R) -> bool {
        other.start() >= self.start() && other.end() <= self.end()
    }
}

/// The capability interface of one field kind.
///
/// `get` never mutates. `set` creates backing sub-structures on demand and
/// reports whether anything changed. `remove` is a no-op (returning
/// `Ok(false)`) when the field is already absent.
///
/// The optional `filter` selects among the values of a multi-valued field:
/// `get` returns the first value satisfying it and `set` rewrites the first
/// such value. Without a filter the first value is used.
pub trait FieldAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String>;

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError>;

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError>;

    /// The object this field is read from and written to for `target`.
    /// Targets sharing a destination are visited once.
    fn destination(&self, _graph: &AnnotationGraph, target: &Target) -> Option<ObjectId> {
        target.primary_id()
    }

    /// Add the current value(s) of this field on `target` to a [`GetSample`].
    ///
    /// Accessors that reach several destination objects from one target
    /// override this so that each destination is counted once.
    fn sample(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
        sample: &mut GetSample,
    ) {
        if let Some(id) = self.destination(graph, target) {
            sample.add(id, self.get(graph, target, filter));
        }
    }
}

/// Walks the annotation graph.
///
/// Implementations must visit each object of the requested kinds within
/// `scope` that passes `filter` exactly once, and supply its genomic context.
pub trait ObjectTraversal {
    fn for_each_matching(
        &self,
        graph: &AnnotationGraph,
        kinds: &[ObjectKind],
        scope: &Scope,
        filter: &FilterSet,
        visit: &mut dyn FnMut(ObjectId, &ObjectContext),
    );
}

/// Decides what to do with text already present in destination fields.
pub trait ConflictDecider {
    fn decide(&mut self, sample: &GetSample) -> ExistingTextPolicy;
}

impl<F> ConflictDecider for F
where
    F: FnMut(&GetSample) -> ExistingTextPolicy,
{
    fn decide(&mut self, sample: &GetSample) -> ExistingTextPolicy {
        self(sample)
    }
}

/// Notified once after a verb has mutated the graph.
pub trait DirtyNotifier {
    fn mark_dirty(&mut self);
}

impl<F> DirtyNotifier for F
where
    F: FnMut(),
{
    fn mark_dirty(&mut self) {
        self()
    }
}
