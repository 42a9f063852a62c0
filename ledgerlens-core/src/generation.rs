use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{LedgerlensError, Stage};

pub type TokenId = u32;

/// Raw output of one model generation call, as handed over by the inference
/// backend. The token sequence includes the prompt; `text` is the decoded
/// completion span with prompt tokens already excluded, which means a forced
/// leading character engineered into the prompt is absent from it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenerationResult {
    pub tokens: Vec<TokenId>,
    pub text: String,
    pub prompt_tokens: usize,
    /// True when generation was cut off by the output token cap rather than
    /// ending on an end-of-sequence token.
    pub truncated: bool,
}

/// How aggressively the backend should enforce the single-JSON-object output
/// contract when rendering the prompt. Retries escalate to `Strict` so the
/// model gets a second chance with stronger instructions and greedy decoding.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptStrictness {
    Standard,
    Strict,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenerationRequest {
    pub stage: Stage,
    pub prompt: String,
    pub strictness: PromptStrictness,
    pub config: GenerationConfig,
}

/// Sampling parameters for one generation call. Defaults differ per stage;
/// both token limits are capped at the model context size.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub max_input_length: u32,
}

impl GenerationConfig {
    pub const MODEL_TOKEN_LIMIT: u32 = 32_768;

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Classification => Self {
                max_new_tokens: 2_500,
                temperature: 0.1,
                top_p: 0.95,
                top_k: 50,
                repetition_penalty: 1.1,
                max_input_length: 29_491,
            },
            // Field mapping emits larger bodies and is more prone to
            // repetition loops.
            Stage::FieldMapping => Self {
                max_new_tokens: 3_000,
                temperature: 0.1,
                top_p: 0.95,
                top_k: 50,
                repetition_penalty: 1.15,
                max_input_length: 29_491,
            },
        }
    }

    /// Clamp both token limits to the model context size.
    pub fn capped(mut self) -> Self {
        if self.max_new_tokens > Self::MODEL_TOKEN_LIMIT {
            tracing::warn!(
                max_new_tokens = self.max_new_tokens,
                "max_new_tokens exceeds model limit, capping"
            );
            self.max_new_tokens = Self::MODEL_TOKEN_LIMIT;
        }
        if self.max_input_length > Self::MODEL_TOKEN_LIMIT {
            tracing::warn!(
                max_input_length = self.max_input_length,
                "max_input_length exceeds model limit, capping"
            );
            self.max_input_length = Self::MODEL_TOKEN_LIMIT;
        }
        self
    }

    /// Deterministic variant used for strict retries: greedy decoding with a
    /// tighter sampling window and a stronger repetition penalty.
    pub fn greedy(mut self) -> Self {
        self.temperature = 0.0;
        self.top_p = 0.9;
        self.top_k = 40;
        self.repetition_penalty = 1.2;
        self
    }
}

/// The external inference collaborator. It runs the model, applies the
/// prompt-forcing suffix, and reports the raw generation; this crate never
/// initiates, awaits, or cancels anything else.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResult, LedgerlensError>;
}
