//! Qualifiers of import features, such as the `note` of a `misc_feature`.

use super::{list_get, list_remove, list_set, unsupported, FieldRef, Target};
use crate::{
    conflict::ApplyValue,
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{Feature, FeatureData, Qualifier},
    traits::FieldAccessor,
};

pub struct ImportAccessor {
    field: FieldRef,
    key: Option<String>,
    qualifier: String,
}

impl ImportAccessor {
    pub fn new(key: Option<&str>, qualifier: &str) -> Self {
        Self {
            field: FieldRef::Import {
                key: key.map(str::to_string),
                qualifier: qualifier.to_string(),
            },
            key: key.map(str::to_string),
            qualifier: qualifier.to_string(),
        }
    }

    fn accepts(&self, feature: &Feature) -> bool {
        match (&feature.data, &self.key) {
            (FeatureData::Import { .. }, None) => true,
            (FeatureData::Import { key }, Some(wanted)) => key.eq_ignore_ascii_case(wanted),
            _ => false,
        }
    }

    fn selects(&self, q: &Qualifier) -> bool {
        q.key.eq_ignore_ascii_case(&self.qualifier)
    }

    fn import_mut<'a>(
        &self,
        graph: &'a mut AnnotationGraph,
        target: &Target,
    ) -> Result<&'a mut Feature, AecrError> {
        target
            .feature_id()
            .and_then(|fid| graph.feature_mut(fid))
            .filter(|f| self.accepts(f))
            .ok_or_else(|| unsupported(&self.field, target))
    }
}

impl FieldAccessor for ImportAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        let feature = graph
            .feature(target.feature_id()?)
            .filter(|f| self.accepts(f))?;
        list_get(&feature.qualifiers, |q: &Qualifier| self.selects(q), filter)
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        let feature = self.import_mut(graph, target)?;
        list_set(
            &mut feature.qualifiers,
            |q: &Qualifier| self.selects(q),
            |v| Qualifier::new(&self.qualifier, &v),
            value,
            filter,
            &self.field,
        )
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let feature = self.import_mut(graph, target)?;
        Ok(list_remove(&mut feature.qualifiers, |q: &Qualifier| self.selects(q)))
    }
}
