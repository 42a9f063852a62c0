use ledgerlens_core::{LedgerlensError, Stage};
use ledgerlens_decode::parse_completion;
use serde_json::json;

#[test]
fn valid_nested_input_is_returned_untouched() {
    let text = r#"{"outer": {"inner": {"deep": [1, 2, 3]}}, "sibling": {"x": "a}b"}}"#;
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert_eq!(repaired.text, text);
    assert_eq!(
        repaired.value,
        json!({"outer": {"inner": {"deep": [1, 2, 3]}}, "sibling": {"x": "a}b"}})
    );
}

#[test]
fn repair_output_reparses_as_a_noop() {
    let truncated = r#"{"accounting_relevance": {"has_accounting_relevance": true}, "semantic_analysis": {}"#;
    let first = parse_completion(Stage::Classification, truncated).unwrap();
    let second = parse_completion(Stage::Classification, &first.text).unwrap();

    assert_eq!(first.text, second.text);
    assert_eq!(first.value, second.value);
}

#[test]
fn missing_closing_delimiter_is_appended() {
    let text = r#"{"accounting_relevance": {"has_accounting_relevance": true}, "semantic_analysis": {}"#;
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert_eq!(
        repaired.value,
        json!({
            "accounting_relevance": {"has_accounting_relevance": true},
            "semantic_analysis": {}
        })
    );
}

#[test]
fn truncated_tail_inside_a_string_is_closed() {
    let text = r#"{"accounting_relevance": {"note": "cut off here"#;
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert_eq!(
        repaired.value,
        json!({"accounting_relevance": {"note": "cut off here"}})
    );
}

#[test]
fn duplicated_opening_delimiter_collapses() {
    let text = r#"{{"actions": [{"action_index": 0, "action_name": "x", "api_request_body": {"a": 1}}]}"#;
    let repaired = parse_completion(Stage::FieldMapping, text).unwrap();

    assert_eq!(
        repaired.value,
        json!({"actions": [{"action_index": 0, "action_name": "x", "api_request_body": {"a": 1}}]})
    );
}

#[test]
fn bare_key_value_sequence_gets_wrapped() {
    let text = r#""accounting_relevance": {"has_accounting_relevance": false}, "semantic_analysis": {"kind": "receipt"}"#;
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert!(repaired.value.get("accounting_relevance").is_some());
    assert!(repaired.value.get("semantic_analysis").is_some());
}

#[test]
fn trailing_comma_before_closer_is_removed() {
    let repaired = parse_completion(
        Stage::Classification,
        r#"{"accounting_relevance": {"tags": [1, 2,],}, "semantic_analysis": {},}"#,
    )
    .unwrap();

    assert_eq!(
        repaired.value,
        json!({"accounting_relevance": {"tags": [1, 2]}, "semantic_analysis": {}})
    );
}

#[test]
fn doubled_commas_collapse() {
    let repaired = parse_completion(
        Stage::Classification,
        r#"{"accounting_relevance": {"a": 1},, "semantic_analysis": {}}"#,
    )
    .unwrap();

    assert_eq!(
        repaired.value,
        json!({"accounting_relevance": {"a": 1}, "semantic_analysis": {}})
    );
}

#[test]
fn surplus_closing_braces_are_dropped_from_the_tail() {
    let text = r#"{"api_request_body": {"amount": 125.5, "customer": "ABC Corp"}}}}"#;
    let repaired = parse_completion(Stage::FieldMapping, text).unwrap();

    assert_eq!(
        repaired.value,
        json!({"api_request_body": {"amount": 125.5, "customer": "ABC Corp"}})
    );
}

#[test]
fn trailing_garbage_after_the_object_is_discarded() {
    let text = r#"{"api_request_body": {"amount": 125.5}} note: the total includes estimated tax"#;
    let repaired = parse_completion(Stage::FieldMapping, text).unwrap();

    assert_eq!(repaired.text, r#"{"api_request_body": {"amount": 125.5}}"#);
    assert_eq!(repaired.value, json!({"api_request_body": {"amount": 125.5}}));
}

#[test]
fn markdown_fences_are_stripped_before_parsing() {
    let text = "```json\n{\"accounting_relevance\": {}, \"semantic_analysis\": {}}\n```";
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert_eq!(
        repaired.value,
        json!({"accounting_relevance": {}, "semantic_analysis": {}})
    );
}

#[test]
fn preamble_prose_before_the_object_is_dropped() {
    let text = r#"Based on the provided document, the result is {"accounting_relevance": {"has_accounting_relevance": true}, "semantic_analysis": {}}"#;
    let repaired = parse_completion(Stage::Classification, text).unwrap();

    assert!(repaired.text.starts_with('{'));
    assert_eq!(
        repaired.value["accounting_relevance"]["has_accounting_relevance"],
        json!(true)
    );
}

#[test]
fn prose_without_any_structure_is_a_prompt_format_violation() {
    let error = parse_completion(Stage::Classification, "I cannot help with that").unwrap_err();
    assert!(matches!(
        error,
        LedgerlensError::PromptFormatViolation {
            stage: Stage::Classification,
            ..
        }
    ));
}

#[test]
fn short_field_mapping_body_is_rejected_before_parsing() {
    let error = parse_completion(Stage::FieldMapping, r#"{"a": 1}"#).unwrap_err();
    assert!(matches!(
        error,
        LedgerlensError::PromptFormatViolation {
            stage: Stage::FieldMapping,
            ..
        }
    ));
}

#[test]
fn top_level_array_is_not_an_acceptable_shape() {
    let error = parse_completion(Stage::Classification, r#"[{"a": 1}]"#).unwrap_err();
    assert!(matches!(
        error,
        LedgerlensError::PromptFormatViolation { .. }
    ));
}

#[test]
fn unrepairable_text_exhausts_the_rule_set() {
    let error = parse_completion(
        Stage::Classification,
        r#"{"accounting_relevance": not even close}"#,
    )
    .unwrap_err();

    assert!(matches!(
        error,
        LedgerlensError::SyntaxRepairExhausted {
            stage: Stage::Classification,
            ..
        }
    ));
}
