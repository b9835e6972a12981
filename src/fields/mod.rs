//! The field accessor registry.
//!
//! A [`FieldRef`] names one field of one kind of annotation object, e.g.
//! `gene.locus`, `rna[tRNA].product` or `source.strain`. Its textual form
//! is what the command line tool and request files use. Every field
//! resolves, through [`FieldRef::accessor`], to a [`FieldAccessor`] that
//! knows how to read and write it on a [`Target`].
//!
//! The accessors for each field domain live in their own submodule. The
//! helpers here implement the single-valued, multi-valued and flag-valued
//! storage shapes they share.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    cdset::CdSet,
    conflict::ApplyValue,
    constraints::string::StringConstraint,
    error::AecrError,
    model::{
        FeatureId, ObjectId, ObjectKind, OrgMod, OrgModSubtype, Qualifier, RnaKind, SubSource,
        SubSourceSubtype,
    },
    traits::FieldAccessor,
};

pub mod cds;
pub mod cgp;
pub mod gene;
pub mod import;
pub mod protein;
pub mod rna;
pub mod source;

/// The thing a verb acts on: one annotation object, or one coding-region
/// cluster for `cgp.*` fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Object(ObjectId),
    Cluster(CdSet),
}

impl Target {
    /// The object used to identify this target in logs and errors.
    pub fn primary_id(&self) -> Option<ObjectId> {
        match self {
            Target::Object(id) => Some(*id),
            Target::Cluster(set) => set.members().first().copied().map(ObjectId::Feature),
        }
    }

    /// The feature this target names, if it is a single feature.
    pub fn feature_id(&self) -> Option<FeatureId> {
        match self {
            Target::Object(ObjectId::Feature(id)) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Object(id) => write!(f, "{}", id),
            Target::Cluster(set) => write!(f, "cluster of {} feature(s)", set.members().len()),
        }
    }
}

/// Enumerations of field names with a fixed textual form.
pub trait NamedField: Copy + Sized + 'static {
    const ALL: &'static [Self];
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneField {
    Locus,
    Description,
    Allele,
    Maploc,
    LocusTag,
    Synonym,
    Comment,
    Pseudo,
}

impl NamedField for GeneField {
    const ALL: &'static [Self] = &[
        GeneField::Locus,
        GeneField::Description,
        GeneField::Allele,
        GeneField::Maploc,
        GeneField::LocusTag,
        GeneField::Synonym,
        GeneField::Comment,
        GeneField::Pseudo,
    ];

    fn name(&self) -> &'static str {
        match self {
            GeneField::Locus => "locus",
            GeneField::Description => "description",
            GeneField::Allele => "allele",
            GeneField::Maploc => "maploc",
            GeneField::LocusTag => "locus-tag",
            GeneField::Synonym => "synonym",
            GeneField::Comment => "comment",
            GeneField::Pseudo => "pseudo",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RnaField {
    Product,
    Comment,
    NcrnaClass,
    CodonsRecognized,
    TagPeptide,
}

impl NamedField for RnaField {
    const ALL: &'static [Self] = &[
        RnaField::Product,
        RnaField::Comment,
        RnaField::NcrnaClass,
        RnaField::CodonsRecognized,
        RnaField::TagPeptide,
    ];

    fn name(&self) -> &'static str {
        match self {
            RnaField::Product => "product",
            RnaField::Comment => "comment",
            RnaField::NcrnaClass => "ncrna-class",
            RnaField::CodonsRecognized => "codons-recognized",
            RnaField::TagPeptide => "tag-peptide",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProteinField {
    Name,
    Description,
    EcNumber,
    Activity,
    Comment,
}

impl NamedField for ProteinField {
    const ALL: &'static [Self] = &[
        ProteinField::Name,
        ProteinField::Description,
        ProteinField::EcNumber,
        ProteinField::Activity,
        ProteinField::Comment,
    ];

    fn name(&self) -> &'static str {
        match self {
            ProteinField::Name => "name",
            ProteinField::Description => "description",
            ProteinField::EcNumber => "ec-number",
            ProteinField::Activity => "activity",
            ProteinField::Comment => "comment",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceQual {
    TaxName,
    CommonName,
    Lineage,
    Division,
    OrgMod(OrgModSubtype),
    SubSource(SubSourceSubtype),
    /// Both kinds of note, read together.
    AllNotes,
    /// The genome (organelle) of the source.
    Location,
    Origin,
}

impl SourceQual {
    fn name(&self) -> &'static str {
        match self {
            SourceQual::TaxName => "taxname",
            SourceQual::CommonName => "common-name",
            SourceQual::Lineage => "lineage",
            SourceQual::Division => "division",
            SourceQual::OrgMod(subtype) => subtype.name(),
            SourceQual::SubSource(subtype) => subtype.name(),
            SourceQual::AllNotes => "all-notes",
            SourceQual::Location => "location",
            SourceQual::Origin => "origin",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let fixed = [
            SourceQual::TaxName,
            SourceQual::CommonName,
            SourceQual::Lineage,
            SourceQual::Division,
            SourceQual::AllNotes,
            SourceQual::Location,
            SourceQual::Origin,
        ];
        fixed
            .into_iter()
            .find(|qual| qual.name().eq_ignore_ascii_case(name))
            .or_else(|| OrgModSubtype::from_name(name).map(SourceQual::OrgMod))
            .or_else(|| SubSourceSubtype::from_name(name).map(SourceQual::SubSource))
    }
}

/// A field of one member kind of a coding-region cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CgpField {
    Gene(GeneField),
    Mrna(RnaField),
    CdsComment,
    Protein(ProteinField),
    MatPeptide(ProteinField),
}

impl fmt::Display for CgpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CgpField::Gene(field) => write!(f, "gene-{}", field.name()),
            CgpField::Mrna(field) => write!(f, "mrna-{}", field.name()),
            CgpField::CdsComment => write!(f, "cds-comment"),
            CgpField::Protein(field) => write!(f, "protein-{}", field.name()),
            CgpField::MatPeptide(field) => write!(f, "mat-peptide-{}", field.name()),
        }
    }
}

impl CgpField {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name == "cds-comment" {
            return Some(CgpField::CdsComment);
        }
        // longest prefix first so "mat-peptide-" is not read as something else
        if let Some(rest) = name.strip_prefix("mat-peptide-") {
            return ProteinField::from_name(rest).map(CgpField::MatPeptide);
        }
        if let Some(rest) = name.strip_prefix("gene-") {
            return GeneField::from_name(rest).map(CgpField::Gene);
        }
        if let Some(rest) = name.strip_prefix("mrna-") {
            return RnaField::from_name(rest).map(CgpField::Mrna);
        }
        if let Some(rest) = name.strip_prefix("protein-") {
            return ProteinField::from_name(rest).map(CgpField::Protein);
        }
        None
    }
}

/// The family of objects a field lives on. Convert, Swap and Parse
/// require source and destination to share a domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldDomain {
    Gene,
    Rna,
    /// Coding regions, including their product protein's fields.
    Cds,
    Source,
    Import,
    CdsGeneProt,
}

/// A reference to one field of one kind of annotation object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldRef {
    Gene(GeneField),
    Rna {
        kind: Option<RnaKind>,
        field: RnaField,
    },
    CdsComment,
    Protein(ProteinField),
    Source(SourceQual),
    Import {
        key: Option<String>,
        qualifier: String,
    },
    CdsGeneProt(CgpField),
}

impl FieldRef {
    pub fn domain(&self) -> FieldDomain {
        match self {
            FieldRef::Gene(_) => FieldDomain::Gene,
            FieldRef::Rna { .. } => FieldDomain::Rna,
            FieldRef::CdsComment | FieldRef::Protein(_) => FieldDomain::Cds,
            FieldRef::Source(_) => FieldDomain::Source,
            FieldRef::Import { .. } => FieldDomain::Import,
            FieldRef::CdsGeneProt(_) => FieldDomain::CdsGeneProt,
        }
    }

    /// Whether verbs on this field act on coding-region clusters.
    pub fn is_cgp(&self) -> bool {
        matches!(self, FieldRef::CdsGeneProt(_))
    }

    /// The object kinds a traversal visits for this field.
    pub fn object_kinds(&self) -> Vec<ObjectKind> {
        match self {
            FieldRef::Gene(_) => vec![ObjectKind::Gene, ObjectKind::GeneXref],
            FieldRef::Rna { kind, .. } => vec![ObjectKind::Rna(*kind)],
            FieldRef::CdsComment | FieldRef::Protein(_) => vec![ObjectKind::Cds],
            FieldRef::Source(_) => vec![ObjectKind::SourceFeature, ObjectKind::SourceDescriptor],
            FieldRef::Import { key, .. } => vec![ObjectKind::Import(key.clone())],
            FieldRef::CdsGeneProt(_) => Vec::new(),
        }
    }

    /// The name of this field as a person would write it inside free text,
    /// e.g. `locus tag` or `strain`.
    pub fn label(&self) -> String {
        let name = match self {
            FieldRef::Gene(field) => field.name(),
            FieldRef::Rna { field, .. } => field.name(),
            FieldRef::CdsComment => "comment",
            FieldRef::Protein(field) => field.name(),
            FieldRef::Source(SourceQual::OrgMod(OrgModSubtype::Note))
            | FieldRef::Source(SourceQual::SubSource(SubSourceSubtype::Note))
            | FieldRef::Source(SourceQual::AllNotes) => "note",
            FieldRef::Source(qual) => qual.name(),
            FieldRef::Import { qualifier, .. } => qualifier.as_str(),
            FieldRef::CdsGeneProt(field) => match field {
                CgpField::Gene(field) => field.name(),
                CgpField::Mrna(field) => field.name(),
                CgpField::CdsComment => "comment",
                CgpField::Protein(field) | CgpField::MatPeptide(field) => field.name(),
            },
        };
        name.replace(['-', '_'], " ")
    }

    /// The accessor that reads and writes this field.
    pub fn accessor(&self) -> Box<dyn FieldAccessor> {
        match self {
            FieldRef::Gene(field) => Box::new(gene::GeneAccessor::new(*field)),
            FieldRef::Rna { kind, field } => Box::new(rna::RnaAccessor::new(*kind, *field)),
            FieldRef::CdsComment => Box::new(cds::CdsCommentAccessor::new()),
            FieldRef::Protein(field) => Box::new(protein::ProteinAccessor::new(*field)),
            FieldRef::Source(qual) => Box::new(source::SourceAccessor::new(*qual)),
            FieldRef::Import { key, qualifier } => {
                Box::new(import::ImportAccessor::new(key.as_deref(), qualifier))
            }
            FieldRef::CdsGeneProt(field) => Box::new(cgp::CgpAccessor::new(*field)),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Gene(field) => write!(f, "gene.{}", field.name()),
            FieldRef::Rna { kind: None, field } => write!(f, "rna.{}", field.name()),
            FieldRef::Rna {
                kind: Some(kind),
                field,
            } => write!(f, "rna[{}].{}", kind.key(), field.name()),
            FieldRef::CdsComment => write!(f, "cds.comment"),
            FieldRef::Protein(field) => write!(f, "protein.{}", field.name()),
            FieldRef::Source(qual) => write!(f, "source.{}", qual.name()),
            FieldRef::Import {
                key: None,
                qualifier,
            } => write!(f, "import.{}", qualifier),
            FieldRef::Import {
                key: Some(key),
                qualifier,
            } => write!(f, "import[{}].{}", key, qualifier),
            FieldRef::CdsGeneProt(field) => write!(f, "cgp.{}", field),
        }
    }
}

impl FromStr for FieldRef {
    type Err = AecrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AecrError::InvalidFieldRef(s.to_string());
        let (head, name) = s.trim().split_once('.').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        // an optional `[qualifier]` on the domain, e.g. rna[tRNA]
        let (domain, qualifier) = match head.split_once('[') {
            Some((domain, rest)) => {
                let inner = rest.strip_suffix(']').ok_or_else(invalid)?;
                if inner.is_empty() {
                    return Err(invalid());
                }
                (domain, Some(inner))
            }
            None => (head, None),
        };
        let field = match (domain.to_ascii_lowercase().as_str(), qualifier) {
            ("gene", None) => GeneField::from_name(name).map(FieldRef::Gene),
            ("rna", kind) => {
                let kind = match kind {
                    Some(kind) => Some(kind.parse::<RnaKind>().map_err(|_| invalid())?),
                    None => None,
                };
                RnaField::from_name(name).map(|field| FieldRef::Rna { kind, field })
            }
            ("cds", None) if name.eq_ignore_ascii_case("comment") => Some(FieldRef::CdsComment),
            ("protein", None) => ProteinField::from_name(name).map(FieldRef::Protein),
            ("source", None) => SourceQual::from_name(name).map(FieldRef::Source),
            ("import", key) if !name.contains(char::is_whitespace) => Some(FieldRef::Import {
                key: key.map(str::to_string),
                qualifier: name.to_string(),
            }),
            ("cgp", None) => CgpField::from_name(name).map(FieldRef::CdsGeneProt),
            _ => None,
        };
        field.ok_or_else(invalid)
    }
}

impl TryFrom<String> for FieldRef {
    type Error = AecrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldRef> for String {
    fn from(value: FieldRef) -> Self {
        value.to_string()
    }
}

/// The error for a field that does not exist on the kind of `target`.
pub(crate) fn unsupported(field: &FieldRef, target: &Target) -> AecrError {
    match target.primary_id() {
        Some(object) => AecrError::FieldUnsupportedForKind {
            field: field.to_string(),
            object,
        },
        None => AecrError::NoMatchingObjects,
    }
}

/// Whether a stored value counts as present and satisfies `filter`.
pub(crate) fn passes(value: &str, filter: Option<&StringConstraint>) -> bool {
    !value.is_empty() && filter.map_or(true, |f| f.matches(value))
}

/// Read a single-valued field.
pub(crate) fn get_single(slot: Option<&str>, filter: Option<&StringConstraint>) -> Option<String> {
    slot.filter(|value| passes(value, filter)).map(str::to_string)
}

/// Write a single-valued field. An empty result clears the slot.
pub(crate) fn set_single(
    slot: &mut Option<String>,
    value: &ApplyValue,
    filter: Option<&StringConstraint>,
) -> bool {
    let current = slot.as_deref().filter(|v| !v.is_empty());
    if filter.is_some() && !current.map_or(false, |v| passes(v, filter)) {
        return false;
    }
    let Some(new) = value.apply_to(current) else {
        return false;
    };
    store_single(slot, new)
}

pub(crate) fn store_single(slot: &mut Option<String>, new: String) -> bool {
    let new = if new.is_empty() { None } else { Some(new) };
    let current = slot.as_deref().filter(|v| !v.is_empty());
    if current == new.as_deref() {
        return false;
    }
    *slot = new;
    true
}

/// Write a flag-valued field, whose text is its own name when set. Any
/// non-empty result sets the flag; an empty one clears it.
pub(crate) fn set_flag(flag: &mut bool, name: &str, value: &ApplyValue) -> bool {
    let current = flag.then_some(name);
    let Some(new) = value.apply_to(current) else {
        return false;
    };
    let wanted = !new.is_empty();
    if *flag == wanted {
        return false;
    }
    *flag = wanted;
    true
}

/// Append to a vector, reporting allocation failure instead of aborting.
pub(crate) fn push_value<T>(items: &mut Vec<T>, item: T, field: &FieldRef) -> Result<(), AecrError> {
    items
        .try_reserve(1)
        .map_err(|_| AecrError::AllocationFailure(field.to_string()))?;
    items.push(item);
    Ok(())
}

/// An element of a vector-backed multi-valued field.
pub(crate) trait TextValue {
    fn text(&self) -> &str;
    fn text_mut(&mut self) -> &mut String;
}

impl TextValue for String {
    fn text(&self) -> &str {
        self
    }

    fn text_mut(&mut self) -> &mut String {
        self
    }
}

impl TextValue for Qualifier {
    fn text(&self) -> &str {
        &self.value
    }

    fn text_mut(&mut self) -> &mut String {
        &mut self.value
    }
}

impl TextValue for OrgMod {
    fn text(&self) -> &str {
        &self.value
    }

    fn text_mut(&mut self) -> &mut String {
        &mut self.value
    }
}

impl TextValue for SubSource {
    fn text(&self) -> &str {
        &self.value
    }

    fn text_mut(&mut self) -> &mut String {
        &mut self.value
    }
}

/// Read the first value, among the elements `select` picks, that satisfies
/// `filter`.
pub(crate) fn list_get<T, S>(items: &[T], select: S, filter: Option<&StringConstraint>) -> Option<String>
where
    T: TextValue,
    S: Fn(&T) -> bool,
{
    items
        .iter()
        .filter(|item| select(*item))
        .map(TextValue::text)
        .find(|value| passes(value, filter))
        .map(str::to_string)
}

/// Rewrite the first value, among the elements `select` picks, that
/// satisfies `filter`.
///
/// A new element is only created (with `make`) when the field has no
/// values at all and no filter is in force. A value rewritten to empty text
/// is dropped.
pub(crate) fn list_set<T, S, M>(
    items: &mut Vec<T>,
    select: S,
    make: M,
    value: &ApplyValue,
    filter: Option<&StringConstraint>,
    field: &FieldRef,
) -> Result<bool, AecrError>
where
    T: TextValue,
    S: Fn(&T) -> bool,
    M: FnOnce(String) -> T,
{
    let index = items
        .iter()
        .position(|item| select(item) && filter.map_or(true, |f| f.matches(item.text())));
    let Some(index) = index else {
        if filter.is_some() || items.iter().any(&select) {
            return Ok(false);
        }
        return match value.apply_to(None) {
            Some(new) if !new.is_empty() => {
                push_value(items, make(new), field)?;
                Ok(true)
            }
            _ => Ok(false),
        };
    };
    let current = items[index].text().to_string();
    let Some(new) = value.apply_to(Some(&current)) else {
        return Ok(false);
    };
    if new == current {
        return Ok(false);
    }
    if new.is_empty() {
        items.remove(index);
    } else {
        *items[index].text_mut() = new;
    }
    Ok(true)
}

/// Drop every element `select` picks.
pub(crate) fn list_remove<T, S>(items: &mut Vec<T>, select: S) -> bool
where
    S: Fn(&T) -> bool,
{
    let before = items.len();
    items.retain(|item| !select(item));
    items.len() != before
}

/// Selects every element of a plain string list.
pub(crate) fn every(_: &String) -> bool {
    true
}
