//! RNA fields.
//!
//! The product of a tRNA has two representations: the structured
//! [`TrnaExt`] (amino acid and codons) and a free-text `product`
//! qualifier. Text that follows the tRNA name grammar is stored
//! structurally and any free-text product is dropped. Text that does not is
//! stored as a qualifier; the structured data is then cleared only if it
//! carries nothing beyond the amino acid, so codons or an anticodon
//! survive and keep naming the tRNA.
//!
//! The product of every other RNA kind is its structured name.

use super::{
    get_single, list_get, list_remove, list_set, push_value, set_single, unsupported, FieldRef,
    RnaField, Target,
};
use crate::{
    conflict::ApplyValue,
    constraints::string::StringConstraint,
    error::AecrError,
    graph::AnnotationGraph,
    model::{
        rna::parse_trna_name, Feature, FeatureData, Qualifier, RnaExt, RnaKind, RnaRef, TrnaExt,
    },
    traits::FieldAccessor,
};

const PRODUCT: &str = "product";

pub struct RnaAccessor {
    field: FieldRef,
    kind: Option<RnaKind>,
    which: RnaField,
}

fn is_product(q: &Qualifier) -> bool {
    q.key.eq_ignore_ascii_case(PRODUCT)
}

/// Parse a codon list such as `GGA, GGG` or `gga ggg`.
fn parse_codons(text: &str) -> Option<Vec<String>> {
    let codons: Vec<String> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|codon| !codon.is_empty())
        .map(|codon| codon.to_ascii_uppercase().replace('U', "T"))
        .collect();
    let valid = codons
        .iter()
        .all(|codon| codon.len() == 3 && codon.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T')));
    valid.then_some(codons)
}

/// The product name of an RNA feature: the structured name, falling back
/// to the first non-empty `product` qualifier.
fn product_name(feature: &Feature, rna: &RnaRef) -> Option<String> {
    rna.name().filter(|name| !name.is_empty()).or_else(|| {
        feature
            .qualifier_values(PRODUCT)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

impl RnaAccessor {
    pub fn new(kind: Option<RnaKind>, which: RnaField) -> Self {
        Self {
            field: FieldRef::Rna { kind, field: which },
            kind,
            which,
        }
    }

    fn qualifier_key(&self) -> Option<&'static str> {
        match self.which {
            RnaField::NcrnaClass => Some("ncRNA_class"),
            RnaField::TagPeptide => Some("tag_peptide"),
            _ => None,
        }
    }

    fn rna<'a>(&self, graph: &'a AnnotationGraph, target: &Target) -> Option<(&'a Feature, &'a RnaRef)> {
        let feature = graph.feature(target.feature_id()?)?;
        match &feature.data {
            FeatureData::Rna(rna) if self.kind.map_or(true, |kind| kind == rna.kind) => {
                Some((feature, rna))
            }
            _ => None,
        }
    }

    fn rna_mut<'a>(
        &self,
        graph: &'a mut AnnotationGraph,
        target: &Target,
    ) -> Result<&'a mut Feature, AecrError> {
        target
            .feature_id()
            .and_then(|fid| graph.feature_mut(fid))
            .filter(|f| {
                matches!(&f.data, FeatureData::Rna(rna) if self.kind.map_or(true, |kind| kind == rna.kind))
            })
            .ok_or_else(|| unsupported(&self.field, target))
    }

    fn set_product(&self, feature: &mut Feature, new: String) -> Result<bool, AecrError> {
        let FeatureData::Rna(rna) = &mut feature.data else {
            return Ok(false);
        };
        if rna.kind != RnaKind::Trna {
            rna.ext = RnaExt::Name { name: new };
            return Ok(true);
        }
        match parse_trna_name(&new) {
            Some((aa, codons)) => {
                let mut trna = rna.trna().cloned().unwrap_or_default();
                trna.aa = Some(aa);
                if !codons.is_empty() {
                    trna.codons = codons;
                }
                rna.ext = RnaExt::Trna(trna);
                feature.qualifiers.retain(|q| !is_product(q));
            }
            None => {
                match feature.qualifiers.iter_mut().find(|q| is_product(q)) {
                    Some(qual) => qual.value = new,
                    None => push_value(
                        &mut feature.qualifiers,
                        Qualifier::new(PRODUCT, &new),
                        &self.field,
                    )?,
                }
                if rna.trna().map_or(true, |trna| !trna.has_secondary_data()) {
                    rna.ext = RnaExt::None;
                }
            }
        }
        Ok(true)
    }

    fn remove_product(feature: &mut Feature) -> bool {
        let before = feature.qualifiers.len();
        feature.qualifiers.retain(|q| !is_product(q));
        let mut changed = feature.qualifiers.len() != before;
        if let FeatureData::Rna(rna) = &mut feature.data {
            let clear = match &mut rna.ext {
                RnaExt::None => false,
                RnaExt::Trna(trna) if trna.has_secondary_data() => {
                    changed |= trna.aa.take().is_some();
                    false
                }
                _ => true,
            };
            if clear {
                rna.ext = RnaExt::None;
                changed = true;
            }
        }
        changed
    }

    fn set_codons(&self, feature: &mut Feature, value: &ApplyValue, target: &Target) -> Result<bool, AecrError> {
        let FeatureData::Rna(rna) = &mut feature.data else {
            return Err(unsupported(&self.field, target));
        };
        if rna.kind != RnaKind::Trna {
            return Err(unsupported(&self.field, target));
        }
        let current = rna
            .trna()
            .filter(|trna| !trna.codons.is_empty())
            .map(|trna| trna.codons.join(", "));
        let Some(new) = value.apply_to(current.as_deref()) else {
            return Ok(false);
        };
        let Some(codons) = parse_codons(&new) else {
            tracing::debug!("'{}' is not a codon list; {} left unchanged", new, self.field);
            return Ok(false);
        };
        match &mut rna.ext {
            RnaExt::Trna(trna) if trna.codons == codons => Ok(false),
            RnaExt::Trna(trna) => {
                trna.codons = codons;
                Ok(true)
            }
            ext => {
                if codons.is_empty() {
                    return Ok(false);
                }
                *ext = RnaExt::Trna(TrnaExt {
                    codons,
                    ..Default::default()
                });
                Ok(true)
            }
        }
    }
}

impl FieldAccessor for RnaAccessor {
    fn get(
        &self,
        graph: &AnnotationGraph,
        target: &Target,
        filter: Option<&StringConstraint>,
    ) -> Option<String> {
        let (feature, rna) = self.rna(graph, target)?;
        match self.which {
            RnaField::Product => get_single(product_name(feature, rna).as_deref(), filter),
            RnaField::Comment => get_single(feature.comment.as_deref(), filter),
            RnaField::CodonsRecognized => {
                let codons = rna
                    .trna()
                    .filter(|trna| !trna.codons.is_empty())
                    .map(|trna| trna.codons.join(", "));
                get_single(codons.as_deref(), filter)
            }
            RnaField::NcrnaClass | RnaField::TagPeptide => {
                let key = self.qualifier_key()?;
                list_get(&feature.qualifiers, |q: &Qualifier| q.key.eq_ignore_ascii_case(key), filter)
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
        match self.which {
            RnaField::Product => {
                let current = self.get(graph, target, None);
                if filter.is_some() && !current.as_deref().map_or(false, |c| super::passes(c, filter)) {
                    // still report a wrong kind as unsupported
                    self.rna_mut(graph, target)?;
                    return Ok(false);
                }
                let feature = self.rna_mut(graph, target)?;
                let Some(new) = value.apply_to(current.as_deref()) else {
                    return Ok(false);
                };
                if current.as_deref() == Some(new.as_str()) {
                    return Ok(false);
                }
                if new.is_empty() {
                    return Ok(Self::remove_product(feature));
                }
                self.set_product(feature, new)
            }
            RnaField::Comment => {
                let feature = self.rna_mut(graph, target)?;
                Ok(set_single(&mut feature.comment, value, filter))
            }
            RnaField::CodonsRecognized => {
                let feature = self.rna_mut(graph, target)?;
                self.set_codons(feature, value, target)
            }
            RnaField::NcrnaClass | RnaField::TagPeptide => {
                let key = self
                    .qualifier_key()
                    .ok_or_else(|| unsupported(&self.field, target))?;
                let feature = self.rna_mut(graph, target)?;
                list_set(
                    &mut feature.qualifiers,
                    |q: &Qualifier| q.key.eq_ignore_ascii_case(key),
                    |v| Qualifier::new(key, &v),
                    value,
                    filter,
                    &self.field,
                )
            }
        }
    }

    fn remove(&self, graph: &mut AnnotationGraph, target: &Target) -> Result<bool, AecrError> {
        let feature = self.rna_mut(graph, target)?;
        let changed = match self.which {
            RnaField::Product => Self::remove_product(feature),
            RnaField::Comment => feature.comment.take().is_some(),
            RnaField::CodonsRecognized => match &mut feature.data {
                FeatureData::Rna(RnaRef {
                    ext: RnaExt::Trna(trna),
                    ..
                }) => !std::mem::take(&mut trna.codons).is_empty(),
                _ => false,
            },
            RnaField::NcrnaClass | RnaField::TagPeptide => match self.qualifier_key() {
                Some(key) => list_remove(&mut feature.qualifiers, |q: &Qualifier| {
                    q.key.eq_ignore_ascii_case(key)
                }),
                None => false,
            },
        };
        Ok(changed)
    }
}
