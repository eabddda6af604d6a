use serde_json::{Value, json};

use form_spec::{
    AggregationType, ChartSpec, ChartType, FormSpec, RenderPayload, RenderStatus, SeriesPoint,
    VisibilityMode, build_render_payload, render::NO_DATA_TEXT, render_json_ui, render_series_text, render_text,
};

fn fixture() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/survey_form.json")).expect("deserialize")
}

fn render(answers: Value) -> RenderPayload {
    build_render_payload(&fixture(), &answers, VisibilityMode::Direct)
}

#[test]
fn cascade_payload_agrees_with_cascade_visibility() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "chain",
        "title": "Chain",
        "fields": [
            { "id": "a", "type": "radio", "label": "A", "options": ["y", "n"] },
            { "id": "b", "type": "radio", "label": "B", "options": ["p", "q"],
              "conditionalLogic": { "enabled": true, "conditions": [
                  { "fieldId": "a", "operator": "equals", "value": "y" } ] } },
            { "id": "c", "type": "text", "label": "C", "required": true,
              "conditionalLogic": { "enabled": true, "conditions": [
                  { "fieldId": "b", "operator": "equals", "value": "p" } ] } }
        ]
    }))
    .expect("form");
    let answers = json!({ "a": "n", "b": "p" });
    let field = |payload: &RenderPayload, id: &str| {
        let field = payload.fields.iter().find(|field| field.id == id).expect("field");
        (field.visible, field.required)
    };

    let direct = build_render_payload(&spec, &answers, VisibilityMode::Direct);
    assert_eq!(field(&direct, "c"), (true, true));
    assert_eq!(direct.status, RenderStatus::NeedInput);

    let cascade = build_render_payload(&spec, &answers, VisibilityMode::Cascade);
    assert_eq!(field(&cascade, "b"), (false, false));
    assert_eq!(field(&cascade, "c"), (false, false));
    assert_eq!(cascade.status, RenderStatus::Complete);
    assert!(cascade.schema["properties"].get("c").is_none());
}

#[test]
fn payload_marks_hidden_fields_optional() {
    let payload = render(json!({ "plan": "Free" }));
    let team = payload
        .fields
        .iter()
        .find(|field| field.id == "team_size")
        .expect("team_size");
    assert!(!team.visible);
    assert!(!team.required);
    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.next_field_id.as_deref(), Some("name"));
    assert_eq!(payload.progress.answered, 1);
    assert_eq!(payload.progress.total, 4);
}

#[test]
fn payload_completes_when_required_visible_fields_are_filled() {
    let payload = render(json!({ "name": "Ana", "plan": "Free" }));
    assert_eq!(payload.status, RenderStatus::Complete);
    assert!(payload.next_field_id.is_none());
}

#[test]
fn render_text_lists_visible_fields() {
    let payload = render(json!({ "plan": "Pro" }));
    let text = render_text(&payload);
    assert!(text.contains("Next required field: name"));
    assert!(text.contains("team_size (Team size, number) [required]"));
    assert!(text.contains("plan (Plan, radio) [required] options: Free | Pro = Pro"));
    assert!(!text.contains("start (Start date, date) [required]"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let payload = render(json!({ "name": "Ana" }));
    let ui = render_json_ui(&payload);
    assert_eq!(ui["formId"], "onboarding-survey");
    assert_eq!(ui["status"], "need_input");
    assert_eq!(ui["nextFieldId"], "plan");
    let fields = ui["fields"].as_array().expect("fields");
    assert_eq!(fields[0]["currentValue"], "Ana");
    assert_eq!(fields[2]["visible"], false);
    assert_eq!(fields[1]["options"], json!(["Free", "Pro"]));
    assert!(ui["schema"]["properties"].get("team_size").is_none());
}

#[test]
fn series_text_shows_points_or_no_data() {
    let chart = ChartSpec {
        title: "Plans".into(),
        chart_type: ChartType::Pie,
        x_axis_field: "plan".into(),
        y_axis_field: None,
        aggregation_type: AggregationType::Count,
    };
    let empty = render_series_text(&chart, &vec![]);
    assert!(empty.starts_with("Plans [pie / count]"));
    assert!(empty.contains(NO_DATA_TEXT));

    let series = vec![
        SeriesPoint {
            name: "Pro".into(),
            value: 2.0,
        },
        SeriesPoint {
            name: "Free".into(),
            value: 1.5,
        },
    ];
    let text = render_series_text(&chart, &series);
    assert!(text.contains("  Pro   2"));
    assert!(text.contains("  Free  1.50"));
}
