use ledgerlens_core::{
    is_retryable, GenerationConfig, GenerationRequest, Generator, LedgerlensError,
    PromptStrictness, RetryPolicy, Stage, Value,
};
use ledgerlens_decode::{parse_completion, PrefixDecoder};
use ledgerlens_shape::{
    validate_classification, validate_field_mapping, ClassificationResponse, FieldMappingResponse,
};

/// Generations this short usually mean the model stopped early or
/// hallucinated a refusal instead of producing the mapping.
const LOW_OUTPUT_TOKENS: usize = 100;

/// Sequences one classification stage end to end:
/// generate → decode → parse (repairing on failure) → validate, with a
/// bounded retry when an attempt fails recoverably.
///
/// First attempts and retries share one decode entry point, so a retried
/// generation can never skip the forced-prefix restoration.
pub struct StageOrchestrator<G> {
    generator: G,
    decoder: PrefixDecoder,
    policy: RetryPolicy,
}

impl<G: Generator> StageOrchestrator<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            decoder: PrefixDecoder::default(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: PrefixDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the coarse classification stage.
    pub async fn classify(
        &self,
        prompt: &str,
    ) -> Result<ClassificationResponse, LedgerlensError> {
        self.classify_with(prompt, GenerationConfig::for_stage(Stage::Classification))
            .await
    }

    pub async fn classify_with(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<ClassificationResponse, LedgerlensError> {
        self.run_stage(Stage::Classification, prompt, config, validate_classification)
            .await
    }

    /// Run the field-mapping stage. Whether the result is a single mapping
    /// or a batch is decided by the response itself.
    pub async fn map_fields(
        &self,
        prompt: &str,
    ) -> Result<FieldMappingResponse, LedgerlensError> {
        self.map_fields_with(prompt, GenerationConfig::for_stage(Stage::FieldMapping))
            .await
    }

    pub async fn map_fields_with(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<FieldMappingResponse, LedgerlensError> {
        self.run_stage(Stage::FieldMapping, prompt, config, validate_field_mapping)
            .await
    }

    async fn run_stage<T>(
        &self,
        stage: Stage,
        prompt: &str,
        config: GenerationConfig,
        validate: fn(Value) -> Result<T, LedgerlensError>,
    ) -> Result<T, LedgerlensError> {
        let config = config.capped();
        let max_attempts = self.policy.max_retries + 1;
        let mut attempt = 1;

        loop {
            let retrying = attempt > 1;
            let request = GenerationRequest {
                stage,
                prompt: prompt.to_string(),
                strictness: if retrying && self.policy.escalate_strictness {
                    PromptStrictness::Strict
                } else {
                    PromptStrictness::Standard
                },
                config: if retrying && self.policy.greedy_retry {
                    config.clone().greedy()
                } else {
                    config.clone()
                },
            };

            let error = match self.attempt(stage, request).await {
                Ok(value) => match validate(value) {
                    Ok(response) => {
                        tracing::info!(stage = %stage, attempt, "stage completed");
                        return Ok(response);
                    }
                    Err(error) => error,
                },
                Err(error) => error,
            };

            if !is_retryable(&error) {
                return Err(error);
            }
            if attempt >= max_attempts {
                return Err(LedgerlensError::RetryBudgetExhausted {
                    stage,
                    attempts: attempt,
                    source: Box::new(error),
                });
            }
            tracing::warn!(stage = %stage, attempt, error = %error, "attempt failed, retrying");
            attempt += 1;
        }
    }

    /// One generate/decode/parse pass. Every attempt lands here — this is
    /// the shared decode entry point.
    async fn attempt(
        &self,
        stage: Stage,
        request: GenerationRequest,
    ) -> Result<Value, LedgerlensError> {
        let generated = self.generator.generate(request).await?;
        let completion = self.decoder.decode(stage, &generated)?;

        if completion.truncated {
            tracing::warn!(stage = %stage, "generation hit the output token cap");
        }
        if completion.completion_tokens > 0 && completion.completion_tokens < LOW_OUTPUT_TOKENS {
            tracing::warn!(
                stage = %stage,
                tokens = completion.completion_tokens,
                "suspiciously short generation"
            );
        }

        let repaired = parse_completion(stage, &completion.text)?;
        Ok(repaired.value)
    }
}
