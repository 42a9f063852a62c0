//! Turn free-text LLM completions into validated, machine-consumable
//! records for financial document classification.
//!
//! The model is prompted to emit a single JSON object, but decoding quirks
//! and imperfect instruction-following produce output that is frequently
//! *almost* valid: a dropped forced prefix, a duplicated brace, a truncated
//! tail, trailing prose. The pipeline here restores the forced prefix,
//! nudges near-valid text back into parseable JSON through a fixed set of
//! narrow repair rules, validates the result against the stage's response
//! grammar, and drives a bounded retry against the generation backend when
//! an attempt fails.

mod orchestrator;

pub use orchestrator::StageOrchestrator;

pub use ledgerlens_core::{
    is_retryable, GenerationConfig, GenerationRequest, GenerationResult, Generator,
    LedgerlensError, Phase, PromptStrictness, RetryPolicy, Stage, TokenId, Value,
};
pub use ledgerlens_decode::{parse_completion, PrefixDecoder, RawCompletion, Repaired};
pub use ledgerlens_shape::{
    validate_classification, validate_field_mapping, ActionMapping, BatchAction,
    ClassificationResponse, FieldMappingResponse,
};
