use serde::{Deserialize, Serialize};

/// Gene payload, used both by gene features and by gene cross-references.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRef {
    #[serde(default)]
    pub locus: Option<String>,
    #[serde(default)]
    pub allele: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub maploc: Option<String>,
    #[serde(default)]
    pub locus_tag: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub pseudo: bool,
}

impl GeneRef {
    /// The locus, falling back to the locus tag.
    pub fn label(&self) -> Option<String> {
        self.locus
            .as_ref()
            .filter(|locus| !locus.is_empty())
            .or(self.locus_tag.as_ref())
            .cloned()
    }

    /// Whether this reference names the same gene as `other`, by locus tag
    /// when both have one and by locus otherwise.
    pub fn refers_to(&self, other: &GeneRef) -> bool {
        match (&self.locus_tag, &other.locus_tag) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => a == b,
            _ => match (&self.locus, &other.locus) {
                (Some(a), Some(b)) if !a.is_empty() => a == b,
                _ => false,
            },
        }
    }

    /// A cross-reference with neither locus nor locus tag suppresses the
    /// overlapping gene.
    pub fn is_suppressor(&self) -> bool {
        self.locus.as_deref().map_or(true, str::is_empty)
            && self.locus_tag.as_deref().map_or(true, str::is_empty)
    }

    pub fn text_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = [&self.locus, &self.allele, &self.desc, &self.maploc, &self.locus_tag]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        values.extend(self.synonyms.iter().map(String::as_str));
        values
    }
}
