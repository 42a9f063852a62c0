use ledgerlens_core::{GenerationResult, LedgerlensError, Stage};

/// Completion text with the forced leading character restored, plus the
/// generation metadata the orchestrator cares about.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCompletion {
    pub text: String,
    /// Tokens the model actually generated (sequence length minus prompt).
    pub completion_tokens: usize,
    pub truncated: bool,
}

/// Reassembles the true completion text. The prompt is engineered to end
/// with the opening delimiter of the JSON object, which biases the model's
/// first token but is excluded from the decoded output span — so the
/// delimiter has to be put back exactly once. If the model regenerated it
/// anyway, the duplicate is collapsed here rather than treated as corruption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixDecoder {
    forced_prefix: Option<char>,
}

impl Default for PrefixDecoder {
    fn default() -> Self {
        Self {
            forced_prefix: Some('{'),
        }
    }
}

impl PrefixDecoder {
    pub fn new(forced_prefix: Option<char>) -> Self {
        Self { forced_prefix }
    }

    /// Shared decode entry point: first attempts and retries both go through
    /// here, so the prefix fix is never forgotten on the retry path.
    pub fn decode(
        &self,
        stage: Stage,
        generated: &GenerationResult,
    ) -> Result<RawCompletion, LedgerlensError> {
        if generated.text.trim().is_empty() {
            return Err(LedgerlensError::PromptFormatViolation {
                stage,
                reason: "model produced an empty completion".to_string(),
            });
        }

        let completion_tokens = generated
            .tokens
            .len()
            .saturating_sub(generated.prompt_tokens);

        let text = match self.forced_prefix {
            Some(prefix) => restore_prefix(prefix, &generated.text),
            None => generated.text.clone(),
        };

        Ok(RawCompletion {
            text,
            completion_tokens,
            truncated: generated.truncated,
        })
    }
}

/// Put the forced character back at the front, collapsing any copies the
/// model emitted on its own. Restoration is idempotent: the output always
/// carries exactly one leading occurrence.
fn restore_prefix(prefix: char, text: &str) -> String {
    let mut body = text.trim_start();
    while let Some(rest) = body.strip_prefix(prefix) {
        body = rest.trim_start();
    }
    let mut restored = String::with_capacity(body.len() + prefix.len_utf8());
    restored.push(prefix);
    restored.push_str(body);
    restored
}
