use std::fmt;

use serde::{Deserialize, Serialize};

/// The two sequential classification passes. Each expects a different
/// response grammar from the model.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Coarse document classification: accounting relevance plus semantic
    /// analysis of the document.
    Classification,
    /// Field mapping: extracted data mapped onto accounting-API request
    /// bodies, either for one action or a batch of actions.
    FieldMapping,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::FieldMapping => "field_mapping",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
