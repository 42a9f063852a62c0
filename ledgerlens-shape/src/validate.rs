use serde_json::Map;

use ledgerlens_core::{LedgerlensError, Stage, Value};

use crate::{ActionMapping, BatchAction, ClassificationResponse, FieldMappingResponse};

/// Structural validation for the classification grammar: both named objects
/// must be present and mapping-typed. No defaulting here — absence of either
/// is a hard failure.
pub fn validate_classification(value: Value) -> Result<ClassificationResponse, LedgerlensError> {
    let stage = Stage::Classification;
    let mut map = into_object(stage, value)?;
    let accounting_relevance = take_object(stage, &mut map, "accounting_relevance", None)?;
    let semantic_analysis = take_object(stage, &mut map, "semantic_analysis", None)?;
    Ok(ClassificationResponse {
        accounting_relevance,
        semantic_analysis,
        extra: map,
    })
}

/// Structural validation for the field-mapping grammar. Batch vs. single is
/// decided by the presence of the `actions` key alone. Checking is purely
/// structural: fields that are present are never rewritten, even when their
/// content looks wrong.
pub fn validate_field_mapping(value: Value) -> Result<FieldMappingResponse, LedgerlensError> {
    let stage = Stage::FieldMapping;
    let mut map = into_object(stage, value)?;

    let Some(actions_value) = map.remove("actions") else {
        return Ok(FieldMappingResponse::Single(validate_mapping(
            stage, map, None,
        )?));
    };

    let entries = match actions_value {
        Value::Array(entries) => entries,
        other => {
            return Err(shape_failure(
                stage,
                "actions",
                None,
                format!("expected an array, found {}", json_type(&other)),
            ));
        }
    };
    if entries.is_empty() {
        return Err(shape_failure(
            stage,
            "actions",
            None,
            "batch response must contain at least one action".to_string(),
        ));
    }

    let mut actions = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let mut entry = match entry {
            Value::Object(entry) => entry,
            other => {
                return Err(shape_failure(
                    stage,
                    &format!("actions[{position}]"),
                    Some(position),
                    format!("expected an object, found {}", json_type(&other)),
                ));
            }
        };

        // Ordering metadata from the caller's request passes through
        // unvalidated; an absent or non-integral index falls back to the
        // element's position.
        let action_index = entry
            .remove("action_index")
            .and_then(|value| value.as_u64())
            .map(|index| index as usize)
            .unwrap_or(position);

        let action_name = match entry.remove("action_name") {
            None => String::new(),
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(shape_failure(
                    stage,
                    &format!("actions[{position}].action_name"),
                    Some(position),
                    format!("expected a string, found {}", json_type(&other)),
                ));
            }
        };

        let mapping = validate_mapping(stage, entry, Some(position))?;
        actions.push(BatchAction {
            action_index,
            action_name,
            mapping,
        });
    }

    Ok(FieldMappingResponse::Batch { actions })
}

/// The one place requirement checking and backfill happen, shared by the
/// single shape and every batch action.
fn validate_mapping(
    stage: Stage,
    mut obj: Map<String, Value>,
    action_index: Option<usize>,
) -> Result<ActionMapping, LedgerlensError> {
    let api_request_body = take_object(stage, &mut obj, "api_request_body", action_index)?;

    let lookups_required = match obj.remove("lookups_required") {
        None => {
            tracing::debug!(action_index, "backfilling empty lookups_required");
            Vec::new()
        }
        Some(Value::Array(lookups)) => lookups,
        Some(other) => {
            return Err(shape_failure(
                stage,
                &field_path("lookups_required", action_index),
                action_index,
                format!("expected an array, found {}", json_type(&other)),
            ));
        }
    };

    let validation = match obj.remove("validation") {
        None => {
            tracing::debug!(action_index, "backfilling empty validation");
            Map::new()
        }
        Some(Value::Object(validation)) => validation,
        Some(other) => {
            return Err(shape_failure(
                stage,
                &field_path("validation", action_index),
                action_index,
                format!("expected an object, found {}", json_type(&other)),
            ));
        }
    };

    Ok(ActionMapping {
        api_request_body,
        lookups_required,
        validation,
        extra: obj,
    })
}

fn into_object(stage: Stage, value: Value) -> Result<Map<String, Value>, LedgerlensError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(shape_failure(
            stage,
            "$",
            None,
            format!("expected an object, found {}", json_type(&other)),
        )),
    }
}

fn take_object(
    stage: Stage,
    map: &mut Map<String, Value>,
    field: &str,
    action_index: Option<usize>,
) -> Result<Map<String, Value>, LedgerlensError> {
    match map.remove(field) {
        Some(Value::Object(obj)) => Ok(obj),
        Some(other) => Err(shape_failure(
            stage,
            &field_path(field, action_index),
            action_index,
            format!("expected an object, found {}", json_type(&other)),
        )),
        None => Err(shape_failure(
            stage,
            &field_path(field, action_index),
            action_index,
            "required field is missing".to_string(),
        )),
    }
}

fn field_path(field: &str, action_index: Option<usize>) -> String {
    match action_index {
        Some(index) => format!("actions[{index}].{field}"),
        None => field.to_string(),
    }
}

fn shape_failure(
    stage: Stage,
    field: &str,
    action_index: Option<usize>,
    reason: String,
) -> LedgerlensError {
    LedgerlensError::ShapeValidationFailure {
        stage,
        field: field.to_string(),
        action_index,
        reason,
    }
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
