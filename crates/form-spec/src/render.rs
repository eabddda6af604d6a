use serde_json::{Map, Value, json};

use crate::{
    aggregate::Series,
    answers_schema,
    spec::{chart::ChartSpec, field::FieldType, form::FormSpec},
    validate::is_empty,
    visibility::{VisibilityMode, is_visible, resolve_visibility},
};

/// Placeholder shown instead of a chart when the series is empty.
pub const NO_DATA_TEXT: &str = "No data to display yet.";

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required field is still unanswered.
    NeedInput,
    /// Every visible required field is filled.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// One field as the submission form should draw it.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub kind: FieldType,
    /// Requiredness actually enforced: hidden fields are never required.
    pub required: bool,
    pub visible: bool,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub current_value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub status: RenderStatus,
    pub next_field_id: Option<String>,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub fields: Vec<RenderField>,
    pub schema: Value,
}

/// Build the renderer payload from the form and the answers entered so far.
/// `mode` must match the one used for any visibility map sent alongside it.
pub fn build_render_payload(
    spec: &FormSpec,
    answers: &Value,
    mode: VisibilityMode,
) -> RenderPayload {
    let visibility = resolve_visibility(spec, answers, mode);

    let fields = spec
        .fields
        .iter()
        .map(|field| {
            let visible = is_visible(&visibility, &field.id);
            RenderField {
                id: field.id.clone(),
                label: field.label.clone(),
                kind: field.kind,
                required: visible && field.required,
                visible,
                placeholder: field.placeholder.clone(),
                options: field.options.clone(),
                current_value: answers
                    .get(&field.id)
                    .filter(|value| !is_empty(value))
                    .cloned(),
            }
        })
        .collect::<Vec<_>>();

    let visible_fields = || fields.iter().filter(|field| field.visible);
    let answered = visible_fields()
        .filter(|field| field.current_value.is_some())
        .count();
    let total = visible_fields().count();
    let next_field_id = visible_fields()
        .find(|field| field.required && field.current_value.is_none())
        .map(|field| field.id.clone());

    let status = if next_field_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        status,
        next_field_id,
        progress: RenderProgress { answered, total },
        help: spec.description.clone(),
        schema: answers_schema::generate(spec, &visibility),
        fields,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if !field.options.is_empty() {
                map.insert("options".into(), json!(field.options));
            }
            if let Some(value) = &field.current_value {
                map.insert("currentValue".into(), value.clone());
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "formId": payload.form_id,
        "formTitle": payload.form_title,
        "status": payload.status.as_str(),
        "nextFieldId": payload.next_field_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "fields": fields,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = vec![
        format!("Form: {} ({})", payload.form_title, payload.form_id),
        format!(
            "Status: {} ({}/{})",
            payload.status.as_str(),
            payload.progress.answered,
            payload.progress.total
        ),
    ];
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }
    match &payload.next_field_id {
        Some(next) => lines.push(format!("Next required field: {}", next)),
        None => lines.push("All required fields are answered.".to_string()),
    }

    lines.push("Visible fields:".to_string());
    for field in payload.fields.iter().filter(|field| field.visible) {
        let mut entry = format!(" - {} ({}, {})", field.id, field.label, field.kind.as_str());
        if field.required {
            entry.push_str(" [required]");
        }
        if !field.options.is_empty() {
            entry.push_str(&format!(" options: {}", field.options.join(" | ")));
        }
        if let Some(value) = &field.current_value {
            entry.push_str(&format!(" = {}", crate::aggregate::category_label(value)));
        }
        lines.push(entry);
    }

    lines.join("\n")
}

/// Render a chart series as text, or the explicit no-data state.
pub fn render_series_text(chart: &ChartSpec, series: &Series) -> String {
    let mut lines = vec![format!(
        "{} [{} / {}]",
        chart.title,
        chart.chart_type.as_str(),
        chart.aggregation_type.as_str()
    )];
    if series.is_empty() {
        lines.push(NO_DATA_TEXT.to_string());
        return lines.join("\n");
    }
    let width = series
        .iter()
        .map(|point| point.name.chars().count())
        .max()
        .unwrap_or(0);
    for point in series {
        lines.push(format!("  {:<width$}  {}", point.name, format_value(point.value)));
    }
    lines.join("\n")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
