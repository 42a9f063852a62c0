use ledgerlens_core::{is_retryable, LedgerlensError, Phase, Stage};

#[test]
fn phases_map_onto_the_failure_taxonomy() {
    let decode = LedgerlensError::PromptFormatViolation {
        stage: Stage::Classification,
        reason: "no JSON".to_string(),
    };
    let parse = LedgerlensError::SyntaxRepairExhausted {
        stage: Stage::Classification,
        rules_applied: 6,
        reason: "EOF while parsing".to_string(),
    };
    let validate = LedgerlensError::ShapeValidationFailure {
        stage: Stage::FieldMapping,
        field: "api_request_body".to_string(),
        action_index: None,
        reason: "required field is missing".to_string(),
    };

    assert_eq!(decode.phase(), Some(Phase::Decode));
    assert_eq!(parse.phase(), Some(Phase::Parse));
    assert_eq!(validate.phase(), Some(Phase::Validate));
    assert_eq!(LedgerlensError::Generation("boom".to_string()).phase(), None);
}

#[test]
fn terminal_retry_failure_reports_stage_and_inner_phase() {
    let inner = LedgerlensError::ShapeValidationFailure {
        stage: Stage::FieldMapping,
        field: "actions[1].api_request_body".to_string(),
        action_index: Some(1),
        reason: "required field is missing".to_string(),
    };
    let terminal = LedgerlensError::RetryBudgetExhausted {
        stage: Stage::FieldMapping,
        attempts: 2,
        source: Box::new(inner),
    };

    assert_eq!(terminal.stage(), Some(Stage::FieldMapping));
    assert_eq!(terminal.phase(), Some(Phase::Validate));
    assert_eq!(terminal.to_string(), "field_mapping failed after 2 attempts");

    let source = std::error::Error::source(&terminal).expect("source chained");
    assert!(source
        .to_string()
        .contains("actions[1].api_request_body"));
}

#[test]
fn only_pipeline_failures_are_retryable() {
    assert!(is_retryable(&LedgerlensError::PromptFormatViolation {
        stage: Stage::Classification,
        reason: String::new(),
    }));
    assert!(is_retryable(&LedgerlensError::SyntaxRepairExhausted {
        stage: Stage::FieldMapping,
        rules_applied: 0,
        reason: String::new(),
    }));
    assert!(is_retryable(&LedgerlensError::ShapeValidationFailure {
        stage: Stage::FieldMapping,
        field: "actions".to_string(),
        action_index: None,
        reason: String::new(),
    }));

    assert!(!is_retryable(&LedgerlensError::Generation(
        "cuda out of memory".to_string()
    )));
    let terminal = LedgerlensError::RetryBudgetExhausted {
        stage: Stage::Classification,
        attempts: 2,
        source: Box::new(LedgerlensError::Generation("boom".to_string())),
    };
    assert!(!is_retryable(&terminal));
}

#[test]
fn shape_failure_display_names_the_field_path() {
    let error = LedgerlensError::ShapeValidationFailure {
        stage: Stage::FieldMapping,
        field: "actions[1].api_request_body".to_string(),
        action_index: Some(1),
        reason: "required field is missing".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "field_mapping response failed shape validation at 'actions[1].api_request_body': \
         required field is missing"
    );
}
