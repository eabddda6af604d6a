use serde_json::{Value, json};

use form_spec::{
    FormSpec, Submission, VisibilityMode, answers_schema, resolve_visibility, validate,
};

fn fixture() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/survey_form.json")).expect("deserialize")
}

fn submission(answers: Value) -> Submission {
    serde_json::from_value(json!({ "answers": answers })).expect("submission")
}

#[test]
fn hidden_required_fields_do_not_block_submission() {
    let result = validate(&fixture(), &submission(json!({ "name": "Ana", "plan": "Free" })));
    assert!(result.valid, "{result:?}");
}

#[test]
fn shown_required_fields_are_enforced() {
    let result = validate(&fixture(), &submission(json!({ "name": "Ana", "plan": "Pro" })));
    assert!(!result.valid);
    assert_eq!(result.missing_required, vec!["team_size", "chart_notes"]);
}

#[test]
fn blank_answers_count_as_missing() {
    let result = validate(
        &fixture(),
        &submission(json!({ "name": "   ", "plan": "Free", "features": [] })),
    );
    assert_eq!(result.missing_required, vec!["name"]);
}

#[test]
fn reports_type_and_option_errors() {
    let result = validate(
        &fixture(),
        &submission(json!({
            "name": 42,
            "plan": "Enterprise",
            "features": ["Charts", "Teleport"],
            "chart_notes": "weekly totals",
            "start": "03/04/2026"
        })),
    );
    let codes: Vec<_> = result
        .errors
        .iter()
        .filter_map(|error| error.code.as_deref())
        .collect();
    assert_eq!(
        codes,
        vec!["type_mismatch", "invalid_option", "invalid_option", "invalid_date"]
    );
    assert_eq!(result.errors[0].path.as_deref(), Some("/name"));
}

#[test]
fn numbers_accept_numeric_strings_and_respect_bounds() {
    let ok = validate(
        &fixture(),
        &submission(json!({
            "name": "Ana", "plan": "Pro", "team_size": "12", "chart_notes": "n"
        })),
    );
    assert!(ok.valid, "{ok:?}");

    let too_big = validate(
        &fixture(),
        &submission(json!({
            "name": "Ana", "plan": "Pro", "team_size": 900, "chart_notes": "n"
        })),
    );
    assert_eq!(too_big.errors[0].code.as_deref(), Some("max"));

    let not_a_number = validate(
        &fixture(),
        &submission(json!({
            "name": "Ana", "plan": "Pro", "team_size": "lots", "chart_notes": "n"
        })),
    );
    assert_eq!(not_a_number.errors[0].code.as_deref(), Some("type_mismatch"));
}

#[test]
fn hidden_fields_are_not_type_checked() {
    let result = validate(
        &fixture(),
        &submission(json!({ "name": "Ana", "plan": "Free", "team_size": "lots" })),
    );
    assert!(result.valid, "{result:?}");
}

#[test]
fn repeated_checkbox_options_are_rejected() {
    let result = validate(
        &fixture(),
        &submission(json!({
            "name": "Ana",
            "plan": "Free",
            "features": ["Charts", "Charts"],
            "chart_notes": "n"
        })),
    );
    assert!(!result.valid);
    assert_eq!(result.errors[0].code.as_deref(), Some("duplicate_option"));
    assert_eq!(result.errors[0].path.as_deref(), Some("/features"));
}

#[test]
fn invalid_patterns_do_not_reject_answers() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "codes",
        "title": "Codes",
        "fields": [
            { "id": "code", "type": "text", "label": "Code",
              "validation": { "pattern": "^[A-Z]{3}$" } },
            { "id": "broken", "type": "text", "label": "Broken",
              "validation": { "pattern": "([a-z" } }
        ]
    }))
    .expect("form");

    let result = validate(&spec, &submission(json!({ "code": "ABC", "broken": "anything" })));
    assert!(result.valid, "{result:?}");

    let result = validate(&spec, &submission(json!({ "code": "abc", "broken": "x" })));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code.as_deref(), Some("pattern_mismatch"));

    let visibility = resolve_visibility(&spec, &json!({}), VisibilityMode::Direct);
    let schema = answers_schema(&spec, &visibility);
    assert_eq!(schema["properties"]["code"]["pattern"], "^[A-Z]{3}$");
    assert!(schema["properties"]["broken"].get("pattern").is_none());
}

#[test]
fn unknown_keys_are_rejected_for_visual_forms_only() {
    let mut spec = fixture();
    let answers = json!({ "name": "Ana", "plan": "Free", "extra": true });
    let result = validate(&spec, &submission(answers.clone()));
    assert_eq!(result.unknown_fields, vec!["extra"]);
    assert!(!result.valid);

    spec.mode = form_spec::FormMode::Code;
    let result = validate(&spec, &submission(answers));
    assert!(result.valid, "{result:?}");
}

#[test]
fn collected_email_must_be_present_and_valid() {
    let mut spec = fixture();
    spec.collect_email = true;
    let answers = json!({ "name": "Ana", "plan": "Free" });

    let missing = validate(&spec, &submission(answers.clone()));
    assert_eq!(missing.errors[0].code.as_deref(), Some("email_required"));

    let bad: Submission =
        serde_json::from_value(json!({ "answers": answers, "email": "ana@" })).expect("body");
    assert_eq!(
        validate(&spec, &bad).errors[0].code.as_deref(),
        Some("invalid_email")
    );

    let good: Submission =
        serde_json::from_value(json!({ "answers": answers, "email": "ana@example.com" }))
            .expect("body");
    assert!(validate(&spec, &good).valid);
}

#[test]
fn schema_lists_only_visible_fields() {
    let spec = fixture();
    let visibility = resolve_visibility(&spec, &json!({ "plan": "Free" }), VisibilityMode::Direct);
    let schema = answers_schema(&spec, &visibility);
    let props = schema["properties"].as_object().expect("properties");
    assert!(props.contains_key("name"));
    assert!(!props.contains_key("team_size"));
    assert_eq!(schema["properties"]["plan"]["enum"], json!(["Free", "Pro"]));
    assert_eq!(schema["properties"]["features"]["type"], "array");
    assert_eq!(schema["properties"]["features"]["uniqueItems"], true);
    assert_eq!(schema["required"], json!(["name", "plan"]));
    assert_eq!(schema["additionalProperties"], false);
}

#[test]
fn code_mode_schema_is_untyped_like_validation() {
    let mut spec = fixture();
    spec.mode = form_spec::FormMode::Code;
    let answers = json!({ "name": 42, "plan": "Enterprise", "features": ["x", "x"] });

    let result = validate(&spec, &submission(answers.clone()));
    assert!(result.valid, "{result:?}");

    let visibility = resolve_visibility(&spec, &answers, VisibilityMode::Direct);
    let schema = answers_schema(&spec, &visibility);
    assert_eq!(schema["properties"]["name"], json!({ "title": "Your name" }));
    assert!(schema["properties"]["features"].get("uniqueItems").is_none());
    assert!(schema["properties"]["plan"].get("enum").is_none());
    assert_eq!(schema["required"], json!(["name", "plan"]));
    assert_eq!(schema["additionalProperties"], true);
}
