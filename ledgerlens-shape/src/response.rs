use serde::{Deserialize, Serialize};
use serde_json::Map;

use ledgerlens_core::Value;

/// Validated output of the classification stage. Both named objects are
/// required; any other top-level fields the model emitted are preserved
/// untouched in `extra`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClassificationResponse {
    pub accounting_relevance: Map<String, Value>,
    pub semantic_analysis: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated output of the field-mapping stage. The two shapes are mutually
/// exclusive and the choice is keyed on the presence of the top-level
/// `actions` sequence alone — never on heuristics over other fields.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldMappingResponse {
    Batch { actions: Vec<BatchAction> },
    Single(ActionMapping),
}

/// One POST-ready API mapping. `lookups_required` and `validation` are
/// guaranteed present after validation, backfilled when the model left them
/// out.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ActionMapping {
    pub api_request_body: Map<String, Value>,
    #[serde(default)]
    pub lookups_required: Vec<Value>,
    #[serde(default)]
    pub validation: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a batch response, addressed by its position in the
/// originating action list.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BatchAction {
    pub action_index: usize,
    pub action_name: String,
    #[serde(flatten)]
    pub mapping: ActionMapping,
}

impl FieldMappingResponse {
    pub fn is_batch(&self) -> bool {
        matches!(self, FieldMappingResponse::Batch { .. })
    }

    /// The contained mappings regardless of shape: one for single, one per
    /// action for batch.
    pub fn mappings(&self) -> Vec<&ActionMapping> {
        match self {
            FieldMappingResponse::Single(mapping) => vec![mapping],
            FieldMappingResponse::Batch { actions } => {
                actions.iter().map(|action| &action.mapping).collect()
            }
        }
    }
}
