use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::answers::{Submission, ValidationError, ValidationResult};
use crate::spec::field::{FieldConstraint, FieldSpec, FieldType};
use crate::spec::form::{FormMode, FormSpec};
use crate::visibility::{VisibilityMode, is_visible, resolve_visibility};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// Author-supplied `pattern` constraints, compiled once per distinct source.
static PATTERNS: LazyLock<Mutex<HashMap<String, Result<Regex, regex::Error>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Compiles a field `pattern`, reusing earlier compilations of the same source.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(compiled) = patterns.get(pattern) {
        return compiled.clone();
    }
    let compiled = Regex::new(pattern);
    patterns.insert(pattern.to_string(), compiled.clone());
    compiled
}

/// Checks a public submission against the form, enforcing only visible fields.
pub fn validate(spec: &FormSpec, submission: &Submission) -> ValidationResult {
    let answers = submission.answers_value();
    let visibility = resolve_visibility(spec, &answers, VisibilityMode::Direct);

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();
    let mut unknown_fields = Vec::new();

    if spec.collect_email {
        match submission.email.as_deref().map(str::trim) {
            None | Some("") => errors.push(email_error("email is required", "email_required")),
            Some(email) if !EMAIL.is_match(email) => {
                errors.push(email_error("invalid email address", "invalid_email"))
            }
            Some(_) => {}
        }
    }

    for field in &spec.fields {
        if !is_visible(&visibility, &field.id) {
            continue;
        }

        match submission.answers.get(&field.id).filter(|value| !is_empty(value)) {
            None => {
                if field.required {
                    missing_required.push(field.id.clone());
                }
            }
            Some(value) => {
                if spec.mode == FormMode::Visual
                    && let Some(error) = validate_value(field, value)
                {
                    errors.push(error);
                }
            }
        }
    }

    if spec.mode == FormMode::Visual {
        unknown_fields = submission
            .answers
            .keys()
            .filter(|key| spec.field(key).is_none())
            .cloned()
            .collect();
    }

    let valid = errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty();
    debug!(
        form = %spec.id,
        valid,
        errors = errors.len(),
        missing = missing_required.len(),
        unknown = unknown_fields.len(),
        "validated submission"
    );

    ValidationResult {
        valid,
        errors,
        missing_required,
        unknown_fields,
    }
}

/// Absent, null, blank strings and empty selections all count as unanswered.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn validate_value(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    let typed = match field.kind {
        FieldType::Text | FieldType::Textarea => value
            .is_string()
            .then_some(())
            .ok_or_else(|| type_mismatch(field)),
        FieldType::Email => match value.as_str() {
            Some(text) if EMAIL.is_match(text.trim()) => Ok(()),
            Some(_) => Err(base_error(field, "invalid email address", "invalid_email")),
            None => Err(type_mismatch(field)),
        },
        FieldType::Number => numeric(value)
            .map(|_| ())
            .ok_or_else(|| type_mismatch(field)),
        FieldType::Date => match value.as_str() {
            Some(text) if DATE.is_match(text) => Ok(()),
            Some(_) => Err(base_error(field, "date must be YYYY-MM-DD", "invalid_date")),
            None => Err(type_mismatch(field)),
        },
        FieldType::Select | FieldType::Radio => match value.as_str() {
            Some(text) if field.options.iter().any(|option| option == text) => Ok(()),
            Some(_) => Err(invalid_option(field)),
            None => Err(type_mismatch(field)),
        },
        FieldType::Checkbox => match value.as_array() {
            Some(items) => {
                let all_known = items.iter().all(|item| {
                    item.as_str()
                        .is_some_and(|text| field.options.iter().any(|option| option == text))
                });
                let repeated = items
                    .iter()
                    .enumerate()
                    .any(|(index, item)| items[..index].contains(item));
                if !all_known {
                    Err(invalid_option(field))
                } else if repeated {
                    Err(base_error(field, "option selected more than once", "duplicate_option"))
                } else {
                    Ok(())
                }
            }
            None => Err(type_mismatch(field)),
        },
    };

    if let Err(error) = typed {
        return Some(error);
    }

    field
        .validation
        .as_ref()
        .and_then(|constraint| enforce_constraint(field, value, constraint))
}

/// Numbers as JSON numbers or numeric strings, the way HTML inputs post them.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn enforce_constraint(
    field: &FieldSpec,
    value: &Value,
    constraint: &FieldConstraint,
) -> Option<ValidationError> {
    if let Some(pattern) = &constraint.pattern
        && let Some(text) = value.as_str()
    {
        match compile_pattern(pattern) {
            Ok(regex) if !regex.is_match(text) => {
                return Some(base_error(
                    field,
                    "value does not match pattern",
                    "pattern_mismatch",
                ));
            }
            Ok(_) => {}
            // Reported by `check_logic`; the submitter cannot fix it.
            Err(err) => warn!(field = %field.id, %err, "skipping invalid pattern"),
        }
    }

    if let Some(min_len) = constraint.min_length
        && let Some(text) = value.as_str()
        && text.chars().count() < min_len
    {
        return Some(base_error(
            field,
            "text shorter than min length",
            "min_length",
        ));
    }

    if let Some(max_len) = constraint.max_length
        && let Some(text) = value.as_str()
        && text.chars().count() > max_len
    {
        return Some(base_error(field, "text longer than max length", "max_length"));
    }

    if field.kind == FieldType::Number {
        let number = numeric(value)?;
        if let Some(min) = constraint.min
            && number < min
        {
            return Some(base_error(field, "value below minimum", "min"));
        }
        if let Some(max) = constraint.max
            && number > max
        {
            return Some(base_error(field, "value above maximum", "max"));
        }
    }

    None
}

fn type_mismatch(field: &FieldSpec) -> ValidationError {
    base_error(field, "type mismatch", "type_mismatch")
}

fn invalid_option(field: &FieldSpec) -> ValidationError {
    base_error(field, "value is not one of the field options", "invalid_option")
}

fn email_error(message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: None,
        path: Some("/email".into()),
        message: message.into(),
        code: Some(code.into()),
    }
}

fn base_error(field: &FieldSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: Some(field.id.clone()),
        path: Some(format!("/{}", field.id)),
        message: message.into(),
        code: Some(code.into()),
    }
}
