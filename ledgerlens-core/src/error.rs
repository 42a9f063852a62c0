use std::fmt;

use thiserror::Error;

use crate::Stage;

/// The pipeline phase an error originated from. Lets callers tell "model
/// went off-script" apart from "model followed the format but omitted
/// required data".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Decode,
    Parse,
    Validate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Decode => "decode",
            Phase::Parse => "parse",
            Phase::Validate => "validate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LedgerlensError {
    #[error("generation backend failed: {0}")]
    Generation(String),

    #[error("{stage} completion does not resemble a JSON object: {reason}")]
    PromptFormatViolation { stage: Stage, reason: String },

    #[error("{stage} completion still unparseable after {rules_applied} repair rules: {reason}")]
    SyntaxRepairExhausted {
        stage: Stage,
        rules_applied: usize,
        reason: String,
    },

    #[error("{stage} response failed shape validation at '{field}': {reason}")]
    ShapeValidationFailure {
        stage: Stage,
        /// Path of the offending field, e.g. `actions[1].api_request_body`.
        field: String,
        /// Index of the offending batch action, when the failure is inside
        /// one.
        action_index: Option<usize>,
        reason: String,
    },

    #[error("{stage} failed after {attempts} attempts")]
    RetryBudgetExhausted {
        stage: Stage,
        attempts: usize,
        #[source]
        source: Box<LedgerlensError>,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LedgerlensError {
    /// The stage the error belongs to, when it was raised inside one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LedgerlensError::PromptFormatViolation { stage, .. }
            | LedgerlensError::SyntaxRepairExhausted { stage, .. }
            | LedgerlensError::ShapeValidationFailure { stage, .. }
            | LedgerlensError::RetryBudgetExhausted { stage, .. } => Some(*stage),
            LedgerlensError::Generation(_) | LedgerlensError::Serde(_) => None,
        }
    }

    /// The failing pipeline phase, when the error maps onto one. A terminal
    /// retry failure reports the phase of its last underlying error.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LedgerlensError::PromptFormatViolation { .. } => Some(Phase::Decode),
            LedgerlensError::SyntaxRepairExhausted { .. } => Some(Phase::Parse),
            LedgerlensError::ShapeValidationFailure { .. } => Some(Phase::Validate),
            LedgerlensError::RetryBudgetExhausted { source, .. } => source.phase(),
            LedgerlensError::Generation(_) | LedgerlensError::Serde(_) => None,
        }
    }
}
