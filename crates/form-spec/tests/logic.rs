use serde_json::json;

use form_spec::{FormSpec, LogicIssue, check_logic, evaluation_order};

fn fixture() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/survey_form.json")).expect("deserialize")
}

fn form(fields: serde_json::Value) -> FormSpec {
    serde_json::from_value(json!({ "id": "lint", "title": "Lint", "fields": fields }))
        .expect("deserialize")
}

fn rule(field_id: &str, operator: &str, value: &str) -> serde_json::Value {
    json!({
        "enabled": true,
        "logicType": "and",
        "conditions": [{ "fieldId": field_id, "operator": operator, "value": value }]
    })
}

#[test]
fn fixture_rules_are_clean() {
    let spec = fixture();
    assert!(check_logic(&spec).is_empty());
    let order = evaluation_order(&spec).expect("acyclic");
    assert_eq!(order, (0..spec.fields.len()).collect::<Vec<_>>());
}

#[test]
fn reports_forward_and_unknown_references() {
    let spec = form(json!([
        { "id": "a", "type": "text", "label": "A", "conditionalLogic": rule("b", "equals", "x") },
        { "id": "b", "type": "select", "label": "B", "options": ["x"] },
        { "id": "c", "type": "text", "label": "C", "conditionalLogic": rule("ghost", "equals", "x") }
    ]));
    let issues = check_logic(&spec);
    assert!(issues.contains(&LogicIssue::ForwardReference {
        field: "a".into(),
        reference: "b".into(),
    }));
    assert!(issues.contains(&LogicIssue::UnknownField {
        field: "c".into(),
        reference: "ghost".into(),
    }));
}

#[test]
fn reports_non_choice_sources_and_scalar_contains() {
    let spec = form(json!([
        { "id": "name", "type": "text", "label": "Name" },
        { "id": "plan", "type": "select", "label": "Plan", "options": ["a", "b"] },
        { "id": "x", "type": "text", "label": "X", "conditionalLogic": rule("name", "equals", "bob") },
        { "id": "y", "type": "text", "label": "Y", "conditionalLogic": rule("plan", "contains", "a") }
    ]));
    let issues = check_logic(&spec);
    assert_eq!(
        issues,
        vec![
            LogicIssue::NotChoiceField {
                field: "x".into(),
                reference: "name".into(),
                kind: "text",
            },
            LogicIssue::ContainsOnSingleValue {
                field: "y".into(),
                reference: "plan".into(),
            },
        ]
    );
}

#[test]
fn disabled_rules_are_not_linted() {
    let mut disabled = rule("ghost", "equals", "x");
    disabled["enabled"] = json!(false);
    let spec = form(json!([
        { "id": "a", "type": "text", "label": "A", "conditionalLogic": disabled }
    ]));
    assert!(check_logic(&spec).is_empty());
}

#[test]
fn reports_patterns_that_do_not_compile() {
    let spec = form(json!([
        { "id": "code", "type": "text", "label": "Code", "validation": { "pattern": "^[A-Z]+$" } },
        { "id": "bad", "type": "text", "label": "Bad", "validation": { "pattern": "(unclosed" } }
    ]));
    let issues = check_logic(&spec);
    assert_eq!(issues.len(), 1);
    assert!(matches!(
        &issues[0],
        LogicIssue::InvalidPattern { field, pattern, .. } if field == "bad" && pattern == "(unclosed"
    ));
    assert!(issues[0].to_string().starts_with("field 'bad' has an invalid pattern '(unclosed'"));
}

#[test]
fn detects_cycles() {
    let spec = form(json!([
        { "id": "a", "type": "select", "label": "A", "options": ["x"], "conditionalLogic": rule("b", "equals", "x") },
        { "id": "b", "type": "select", "label": "B", "options": ["x"], "conditionalLogic": rule("a", "equals", "x") },
        { "id": "c", "type": "text", "label": "C" }
    ]));
    let err = evaluation_order(&spec).expect_err("cycle");
    assert_eq!(
        err,
        LogicIssue::Cycle {
            fields: vec!["a".into(), "b".into()],
        }
    );
    assert!(check_logic(&spec).contains(&err));
}

#[test]
fn orders_dependents_after_sources() {
    let spec = form(json!([
        { "id": "late", "type": "text", "label": "Late", "conditionalLogic": rule("src", "equals", "x") },
        { "id": "free", "type": "text", "label": "Free" },
        { "id": "src", "type": "radio", "label": "Src", "options": ["x"] }
    ]));
    assert_eq!(evaluation_order(&spec).expect("acyclic"), vec![1, 2, 0]);
}
