use serde::{Deserialize, Serialize};

/// Processing state of a protein feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtProcessing {
    /// The full-length product.
    #[default]
    NotSet,
    Preprotein,
    Mature,
    SignalPeptide,
    TransitPeptide,
}

impl ProtProcessing {
    pub fn key(&self) -> &'static str {
        match self {
            ProtProcessing::NotSet => "Protein",
            ProtProcessing::Preprotein => "proprotein",
            ProtProcessing::Mature => "mat_peptide",
            ProtProcessing::SignalPeptide => "sig_peptide",
            ProtProcessing::TransitPeptide => "transit_peptide",
        }
    }
}

/// Protein payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtRef {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub ec: Vec<String>,
    #[serde(default)]
    pub activity: Vec<String>,
    #[serde(default)]
    pub processed: ProtProcessing,
}

impl ProtRef {
    pub fn is_full_length(&self) -> bool {
        self.processed == ProtProcessing::NotSet
    }

    pub fn is_mature_peptide(&self) -> bool {
        self.processed == ProtProcessing::Mature
    }

    pub fn text_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.names.iter().map(String::as_str).collect();
        values.extend(self.desc.as_deref());
        values.extend(self.ec.iter().map(String::as_str));
        values.extend(self.activity.iter().map(String::as_str));
        values
    }
}
