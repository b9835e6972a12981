//! The coding region comment.

use super::{get_single, set_single, unsupported, FieldRef, Target};
use crate::{
    conflict::ApplyValue, constraints::string::StringConstraint, error::AecrError,
    graph::AnnotationGraph, model::Feature, traits::FieldAccessor,
};

pub struct CdsCommentAccessor {
    field: FieldRef,
}

impl Default for CdsCommentAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CdsCommentAccessor {
    pub fn new() -> Self {
        Self {
            field: FieldRef::CdsComment,
        }
    }

    fn cds_mut<'a>(&self, graph: &'a mut AnnotationGraph, target: &Target) -> Result<&'a mut Feature, AecrError> {
        target
            .feature_id()
            .and_then(|fid| graph.feature_mut(fid))
            .filter(|f| f.is_cds())
            .ok_or_else(|| unsupported(&self.field, target))
    }
}

impl FieldAccessor for CdsCommentAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        let feature = graph.feature(target.feature_id()?).filter(|f| f.is_cds())?;
        get_single(feature.comment.as_deref(), filter)
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        let cds = self.cds_mut(graph, target)?;
        Ok(set_single(&mut cds.comment, value, filter))
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let cds = self.cds_mut(graph, target)?;
        Ok(cds.comment.take().is_some())
    }
}
