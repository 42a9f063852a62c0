mod error;
mod generation;
mod retry;
mod stage;

pub use error::{LedgerlensError, Phase};
pub use generation::{
    GenerationConfig, GenerationRequest, GenerationResult, Generator, PromptStrictness, TokenId,
};
pub use retry::{is_retryable, RetryPolicy};
pub use stage::Stage;

pub type Value = serde_json::Value;
