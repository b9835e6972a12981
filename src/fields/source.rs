//! Source qualifiers, on source features and source descriptors alike.

use std::str::FromStr;

use super::{
    get_single, list_get, list_remove, list_set, passes, push_value, set_single, unsupported,
    FieldRef, SourceQual, Target,
};
use crate::{
    conflict::ApplyValue,
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{
        BioSource, DescriptorData, FeatureData, Genome, ObjectId, OrgMod, OrgModSubtype, Origin,
        SubSource, SubSourceSubtype,
    },
    traits::FieldAccessor,
};

/// Separator used when both kinds of note are read together.
const NOTE_SEPARATOR: &str = "; ";

pub struct SourceAccessor {
    field: FieldRef,
    which: SourceQual,
}

fn biosource<'a>(graph: &'a AnnotationGraph, target: &Target) -> Option<&'a BioSource> {
    match target.primary_id()? {
        ObjectId::Feature(fid) => match &graph.feature(fid)?.data {
            FeatureData::Source(biosrc) => Some(biosrc),
            _ => None,
        },
        ObjectId::Descriptor(did) => graph.descriptor(did)?.biosource(),
    }
}

fn biosource_mut<'a>(graph: &'a mut AnnotationGraph, target: &Target) -> Option<&'a mut BioSource> {
    if matches!(target, Target::Cluster(_)) {
        return None;
    }
    match target.primary_id()? {
        ObjectId::Feature(fid) => match &mut graph.feature_mut(fid)?.data {
            FeatureData::Source(biosrc) => Some(biosrc),
            _ => None,
        },
        ObjectId::Descriptor(did) => match &mut graph.descriptor_mut(did)?.data {
            DescriptorData::Source(biosrc) => Some(biosrc),
            _ => None,
        },
    }
}

fn is_subsrc_note(s: &SubSource) -> bool {
    s.subtype == SubSourceSubtype::Note
}

fn is_orgmod_note(m: &OrgMod) -> bool {
    m.subtype == OrgModSubtype::Note
}

/// Write an enumerated value given by name. Text that names no value of
/// the enumeration leaves the field untouched, and the object is skipped.
fn set_named<T>(
    slot: &mut T,
    name_of: fn(&T) -> &'static str,
    value: &ApplyValue,
    field: &FieldRef,
    target: &Target,
) -> Result<bool, AecrError>
where
    T: FromStr + Default + PartialEq,
{
    let current = Some(name_of(slot)).filter(|_| *slot != T::default());
    let Some(new) = value.apply_to(current) else {
        return Ok(false);
    };
    let parsed = if new.is_empty() {
        T::default()
    } else {
        match new.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::debug!("'{}' is not a valid value for {}", new, field);
                return Err(unsupported(field, target));
            }
        }
    };
    if *slot == parsed {
        return Ok(false);
    }
    *slot = parsed;
    Ok(true)
}

impl SourceAccessor {
    pub fn new(which: SourceQual) -> Self {
        Self {
            field: FieldRef::Source(which),
            which,
        }
    }

    fn set_subsource(
        &self,
        biosrc: &mut BioSource,
        subtype: SubSourceSubtype,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        let select = |s: &SubSource| s.subtype == subtype;
        if !subtype.is_flag() {
            return list_set(
                &mut biosrc.subtypes,
                select,
                |v| SubSource { subtype, value: v },
                value,
                filter,
                &self.field,
            );
        }
        let present = biosrc.subtypes.iter().any(select);
        let current = present.then_some(subtype.name());
        if filter.is_some() && !current.map_or(false, |c| passes(c, filter)) {
            return Ok(false);
        }
        let Some(new) = value.apply_to(current) else {
            return Ok(false);
        };
        match (present, new.is_empty()) {
            (true, true) => Ok(list_remove(&mut biosrc.subtypes, select)),
            (false, false) => {
                push_value(
                    &mut biosrc.subtypes,
                    SubSource {
                        subtype,
                        value: String::new(),
                    },
                    &self.field,
                )?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl FieldAccessor for SourceAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        if matches!(target, Target::Cluster(_)) {
            return None;
        }
        let biosrc = biosource(graph, target)?;
        let org = &biosrc.org;
        match self.which {
            SourceQual::TaxName => get_single(org.taxname.as_deref(), filter),
            SourceQual::CommonName => get_single(org.common.as_deref(), filter),
            SourceQual::Lineage => get_single(org.lineage.as_deref(), filter),
            SourceQual::Division => get_single(org.division.as_deref(), filter),
            SourceQual::OrgMod(subtype) => list_get(&org.mods, |m: &OrgMod| m.subtype == subtype, filter),
            SourceQual::SubSource(subtype) if subtype.is_flag() => {
                let present = biosrc.subtypes.iter().any(|s| s.subtype == subtype);
                get_single(present.then_some(subtype.name()), filter)
            }
            SourceQual::SubSource(subtype) => {
                list_get(&biosrc.subtypes, |s: &SubSource| s.subtype == subtype, filter)
            }
            SourceQual::AllNotes => {
                let notes: Vec<&str> = biosrc
                    .subtypes
                    .iter()
                    .filter(|s| is_subsrc_note(s))
                    .map(|s| s.value.as_str())
                    .chain(org.mods.iter().filter(|m| is_orgmod_note(m)).map(|m| m.value.as_str()))
                    .filter(|note| passes(note, filter))
                    .collect();
                (!notes.is_empty()).then(|| notes.join(NOTE_SEPARATOR))
            }
            SourceQual::Location => {
                let name = (biosrc.genome != Genome::Unknown).then(|| biosrc.genome.name());
                get_single(name, filter)
            }
            SourceQual::Origin => {
                let name = (biosrc.origin != Origin::Unknown).then(|| biosrc.origin.name());
                get_single(name, filter)
            }
        }
    }

    fn set(
        &self,
        graph: &mut AnnotationGraph,
        target: &Target,
        value: &ApplyValue,
        filter: Option<&StringConstraint>,
    ) -> Result<bool, AecrError> {
        let biosrc = biosource_mut(graph, target).ok_or_else(|| unsupported(&self.field, target))?;
        let field = &self.field;
        match self.which {
            SourceQual::TaxName => Ok(set_single(&mut biosrc.org.taxname, value, filter)),
            SourceQual::CommonName => Ok(set_single(&mut biosrc.org.common, value, filter)),
            SourceQual::Lineage => Ok(set_single(&mut biosrc.org.lineage, value, filter)),
            SourceQual::Division => Ok(set_single(&mut biosrc.org.division, value, filter)),
            SourceQual::OrgMod(subtype) => list_set(
                &mut biosrc.org.mods,
                |m: &OrgMod| m.subtype == subtype,
                |v| OrgMod { subtype, value: v },
                value,
                filter,
                field,
            ),
            SourceQual::SubSource(subtype) => self.set_subsource(biosrc, subtype, value, filter),
            SourceQual::AllNotes => {
                // write where a matching note already is, preferring the
                // sub-source note, which is also where new notes go
                let in_subsrc = biosrc
                    .subtypes
                    .iter()
                    .any(|s| is_subsrc_note(s) && passes(&s.value, filter));
                let in_orgmod = biosrc
                    .org
                    .mods
                    .iter()
                    .any(|m| is_orgmod_note(m) && passes(&m.value, filter));
                if in_orgmod && !in_subsrc {
                    list_set(
                        &mut biosrc.org.mods,
                        is_orgmod_note,
                        |v| OrgMod {
                            subtype: OrgModSubtype::Note,
                            value: v,
                        },
                        value,
                        filter,
                        field,
                    )
                } else {
                    list_set(
                        &mut biosrc.subtypes,
                        is_subsrc_note,
                        |v| SubSource {
                            subtype: SubSourceSubtype::Note,
                            value: v,
                        },
                        value,
                        filter,
                        field,
                    )
                }
            }
            SourceQual::Location => {
                if filter.is_some_and(|f| !f.matches(biosrc.genome.name())) {
                    return Ok(false);
                }
                set_named(&mut biosrc.genome, Genome::name, value, field, target)
            }
            SourceQual::Origin => {
                if filter.is_some_and(|f| !f.matches(biosrc.origin.name())) {
                    return Ok(false);
                }
                set_named(&mut biosrc.origin, Origin::name, value, field, target)
            }
        }
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let biosrc = biosource_mut(graph, target).ok_or_else(|| unsupported(&self.field, target))?;
        let changed = match self.which {
            SourceQual::TaxName => biosrc.org.taxname.take().is_some(),
            SourceQual::CommonName => biosrc.org.common.take().is_some(),
            SourceQual::Lineage => biosrc.org.lineage.take().is_some(),
            SourceQual::Division => biosrc.org.division.take().is_some(),
            SourceQual::OrgMod(subtype) => {
                list_remove(&mut biosrc.org.mods, |m: &OrgMod| m.subtype == subtype)
            }
            SourceQual::SubSource(subtype) => {
                list_remove(&mut biosrc.subtypes, |s: &SubSource| s.subtype == subtype)
            }
            SourceQual::AllNotes => {
                let subsrc = list_remove(&mut biosrc.subtypes, is_subsrc_note);
                let orgmod = list_remove(&mut biosrc.org.mods, is_orgmod_note);
                subsrc || orgmod
            }
            SourceQual::Location => std::mem::take(&mut biosrc.genome) != Genome::Unknown,
            SourceQual::Origin => std::mem::take(&mut biosrc.origin) != Origin::Unknown,
        };
        Ok(changed)
    }
}
