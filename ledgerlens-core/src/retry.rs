use serde::{Deserialize, Serialize};

use crate::LedgerlensError;

/// Bounded retry behavior for one stage invocation. The retry count and
/// whether retries escalate prompting are deliberately configuration, not a
/// fixed contract.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional generation attempts after the first one fails.
    pub max_retries: usize,
    /// Re-prompt with strict JSON enforcement on retries.
    pub escalate_strictness: bool,
    /// Switch to greedy decoding on retries.
    pub greedy_retry: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            escalate_strictness: true,
            greedy_retry: true,
        }
    }
}

/// Repair and validation failures are recoverable within a stage; backend
/// failures and serialization bugs are not.
pub fn is_retryable(error: &LedgerlensError) -> bool {
    matches!(
        error,
        LedgerlensError::PromptFormatViolation { .. }
            | LedgerlensError::SyntaxRepairExhausted { .. }
            | LedgerlensError::ShapeValidationFailure { .. }
    )
}
