use ledgerlens_core::{LedgerlensError, Stage, Value};

/// A completion that made it through parsing, possibly after repair. The
/// parsed value and the text it was parsed from travel together so callers
/// cannot re-parse something different.
#[derive(Clone, Debug, PartialEq)]
pub struct Repaired {
    pub value: Value,
    pub text: String,
}

/// A field-mapping body this short cannot hold a usable request body; treat
/// it as the model going off-script rather than parsing a trivially empty
/// object.
const MIN_FIELD_MAPPING_LEN: usize = 50;

/// Preamble phrases the model sometimes emits before the JSON despite the
/// prompt forbidding it. Matched case-insensitively in the head of the text.
const PREAMBLE_PATTERNS: &[&str] = &[
    "based on the",
    "based on this",
    "here's the",
    "here is the",
    "the following is",
    "below is the",
    "i'll provide",
    "let me provide",
    "sure, here",
    "certainly",
    "looking at the document",
    "from the document",
];

const PREAMBLE_WINDOW: usize = 200;

type Rule = fn(&str) -> Option<String>;

/// Fixed repair order. Each rule fires only on its own narrow pattern and
/// the text is re-parsed after every rewrite; the first successful parse
/// wins. A rule keyed on a closing delimiter followed by the next sibling
/// key is deliberately absent: that pattern also occurs inside valid nested
/// objects, and rewriting it destroys them.
const RULES: &[(&str, Rule)] = &[
    ("collapse-duplicate-opening", collapse_duplicate_opening),
    ("wrap-bare-object", wrap_bare_object),
    ("close-unbalanced-delimiters", close_unbalanced_delimiters),
    ("strip-trailing-commas", strip_trailing_commas),
    ("drop-surplus-closers", drop_surplus_closers),
    ("truncate-trailing-garbage", truncate_trailing_garbage),
];

/// Parse a decoded completion into a JSON object, nudging near-valid text
/// into shape when the first parse fails. Returns a hard error once the rule
/// set is exhausted — never syntactically invalid text.
pub fn parse_completion(stage: Stage, raw: &str) -> Result<Repaired, LedgerlensError> {
    let cleaned = preclean(raw);

    if stage == Stage::FieldMapping && cleaned.len() < MIN_FIELD_MAPPING_LEN {
        return Err(LedgerlensError::PromptFormatViolation {
            stage,
            reason: format!(
                "completion too short to hold a field mapping ({} chars)",
                cleaned.len()
            ),
        });
    }

    let mut last_error = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return finish(stage, value, cleaned),
        Err(error) => error,
    };

    // A restored forced prefix makes even pure prose start with '{', so the
    // off-script check looks past leading delimiters.
    if !resembles_object(&cleaned) {
        return Err(LedgerlensError::PromptFormatViolation {
            stage,
            reason: "completion is prose without any JSON structure".to_string(),
        });
    }

    let mut text = cleaned;
    let mut rules_applied = 0;
    for (name, rule) in RULES.iter().copied() {
        let Some(rewritten) = rule(&text) else {
            continue;
        };
        tracing::warn!(stage = %stage, rule = name, "repair rule rewrote completion");
        rules_applied += 1;
        text = rewritten;
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                tracing::debug!(stage = %stage, rules_applied, "completion parsed after repair");
                return finish(stage, value, text);
            }
            Err(error) => last_error = error,
        }
    }

    Err(LedgerlensError::SyntaxRepairExhausted {
        stage,
        rules_applied,
        reason: last_error.to_string(),
    })
}

fn finish(stage: Stage, value: Value, text: String) -> Result<Repaired, LedgerlensError> {
    if !value.is_object() {
        return Err(LedgerlensError::PromptFormatViolation {
            stage,
            reason: format!("top-level JSON is {}, expected an object", json_type(&value)),
        });
    }
    Ok(Repaired { value, text })
}

/// Does the text carry any JSON structure beyond (possibly restored)
/// opening delimiters? Pure refusal prose does not.
fn resembles_object(text: &str) -> bool {
    let body = text.trim_start().trim_start_matches('{').trim_start();
    body.contains('"') || body.contains(':') || body.contains('{') || body.contains('[')
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strip markdown code fences and leading preamble prose. Runs before the
/// first parse attempt; text that already starts with the object delimiter
/// passes through untouched apart from trimming.
fn preclean(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if text.contains("```") {
        text = text.replace("```json", "").replace("```", "");
        text = text.trim().to_string();
    }

    if !text.starts_with('{') {
        let head: String = text
            .chars()
            .take(PREAMBLE_WINDOW)
            .collect::<String>()
            .to_lowercase();
        let has_preamble = PREAMBLE_PATTERNS
            .iter()
            .any(|pattern| head.contains(pattern));
        if has_preamble {
            if let Some(start) = text.find('{') {
                tracing::warn!(dropped = start, "dropping preamble text before JSON");
                text = text[start..].to_string();
            }
        }
    }

    text
}

/// Tracks string-literal state so rules only react to structural characters.
#[derive(Default)]
struct Scanner {
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Feed one character; returns true when it is structural (outside any
    /// string literal).
    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            false
        } else if c == '"' {
            self.in_string = true;
            false
        } else {
            true
        }
    }
}

/// `{{"…` at the start can never open valid JSON; the model regenerated the
/// forced delimiter. Remove one copy.
fn collapse_duplicate_opening(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix('{')?;
    rest.trim_start()
        .starts_with('{')
        .then(|| rest.trim_start().to_string())
}

/// A bare `"key": value, …` sequence without the enclosing object gets one
/// pair of delimiters wrapped around it.
fn wrap_bare_object(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || !trimmed.starts_with('"') {
        return None;
    }
    Some(format!("{{{trimmed}}}"))
}

/// Append the closing delimiters a truncated tail dropped. Works from the
/// actual open-delimiter stack rather than local patterns, so valid nesting
/// can never be damaged. A string left open by the truncation is closed
/// first.
fn close_unbalanced_delimiters(text: &str) -> Option<String> {
    let mut scan = Scanner::default();
    let mut stack = Vec::new();
    for c in text.chars() {
        if !scan.step(c) {
            continue;
        }
        match c {
            '{' | '[' => stack.push(c),
            '}' if stack.last() == Some(&'{') => {
                stack.pop();
            }
            ']' if stack.last() == Some(&'[') => {
                stack.pop();
            }
            _ => {}
        }
    }
    if stack.is_empty() && !scan.in_string {
        return None;
    }

    let mut repaired = text.trim_end().to_string();
    if scan.in_string {
        repaired.push('"');
    }
    for opener in stack.iter().rev() {
        repaired.push(match opener {
            '{' => '}',
            _ => ']',
        });
    }
    Some(repaired)
}

/// Remove commas that directly precede a closing delimiter, and collapse
/// doubled commas, outside string literals.
fn strip_trailing_commas(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut scan = Scanner::default();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let structural = scan.step(c);
        if structural && c == ',' {
            let mut j = i + 1;
            let mut doubled = false;
            while j < chars.len() && (chars[j].is_whitespace() || chars[j] == ',') {
                if chars[j] == ',' {
                    doubled = true;
                }
                j += 1;
            }
            let before_closer = matches!(chars.get(j), Some('}') | Some(']'));
            if before_closer || doubled {
                if !before_closer {
                    out.push(',');
                }
                for k in (i + 1)..j {
                    if chars[k].is_whitespace() {
                        out.push(chars[k]);
                    }
                }
                changed = true;
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    changed.then_some(out)
}

/// When closing braces outnumber opening ones the model stuttered on the
/// way out; drop the surplus from the tail.
fn drop_surplus_closers(text: &str) -> Option<String> {
    let mut scan = Scanner::default();
    let mut open = 0usize;
    let mut close = 0usize;
    for c in text.chars() {
        if !scan.step(c) {
            continue;
        }
        match c {
            '{' => open += 1,
            '}' => close += 1,
            _ => {}
        }
    }
    if close <= open {
        return None;
    }

    let mut surplus = close - open;
    let mut repaired = text.trim_end().to_string();
    while surplus > 0 && repaired.ends_with('}') {
        repaired.pop();
        repaired.truncate(repaired.trim_end().len());
        surplus -= 1;
    }
    Some(repaired)
}

/// The model kept talking after the object was complete. Keep the first
/// balanced top-level object, discard the rest.
fn truncate_trailing_garbage(text: &str) -> Option<String> {
    let mut scan = Scanner::default();
    let mut depth = 0usize;
    let mut started = false;
    for (i, c) in text.char_indices() {
        if !scan.step(c) {
            continue;
        }
        match c {
            '{' | '[' => {
                depth += 1;
                started = true;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if started && depth == 0 {
                    let end = i + c.len_utf8();
                    if text[end..].trim().is_empty() {
                        return None;
                    }
                    return Some(text[..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
