//! JSON-in/JSON-out facade used by the HTTP layer.
//!
//! Every entry point takes raw JSON strings and returns a JSON string; failures
//! are reported as `{"error": "..."}` rather than panics.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

use form_spec::{
    ChartBoard, ChartSpec, FormSpec, StoredResponse, Submission, ToolCall, ToolError,
    ToolInvocation, VisibilityMode, aggregate, answers_schema as schema_for_answers,
    build_render_payload, check_logic, render_json_ui, resolve_visibility, validate,
};

/// Status returned when a submission is stored.
pub const STATUS_CREATED: u16 = 201;
/// Status returned when a submission is rejected.
pub const STATUS_BAD_REQUEST: u16 = 400;

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

fn parse<T: DeserializeOwned>(what: &'static str, raw: &str) -> Result<T, ComponentError> {
    serde_json::from_str(raw).map_err(|source| ComponentError::Parse { what, source })
}

fn parse_answers(answers_json: &str) -> Value {
    serde_json::from_str::<Value>(answers_json)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

fn ensure_form(form_id: &str, form_json: &str) -> Result<FormSpec, ComponentError> {
    let spec: FormSpec = parse("form", form_json)?;
    if spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, form_json: &str) -> String {
    respond(ensure_form(form_id, form_json).and_then(|spec| encode(&spec)))
}

/// Lints the conditional rules of a form.
pub fn check_form(form_id: &str, form_json: &str) -> String {
    respond(ensure_form(form_id, form_json).map(|spec| {
        let issues = check_logic(&spec)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        json!({ "valid": issues.is_empty(), "issues": issues })
    }))
}

/// Client-side use site: which fields to draw and which to mark required.
pub fn visibility(form_id: &str, form_json: &str, answers_json: &str, cascade: bool) -> String {
    respond(ensure_form(form_id, form_json).map(|spec| {
        let answers = parse_answers(answers_json);
        let mode = if cascade {
            VisibilityMode::Cascade
        } else {
            VisibilityMode::Direct
        };
        let visibility = resolve_visibility(&spec, &answers, mode);
        let payload = build_render_payload(&spec, &answers, mode);
        json!({
            "visibility": visibility,
            "form": render_json_ui(&payload),
        })
    }))
}

pub fn answers_schema(form_id: &str, form_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, form_json).map(|spec| {
        let answers = parse_answers(answers_json);
        let visibility = resolve_visibility(&spec, &answers, VisibilityMode::Direct);
        schema_for_answers(&spec, &visibility)
    }))
}

/// Server-side use site: accepts or rejects a public submission body.
pub fn submit(form_id: &str, form_json: &str, body_json: &str) -> String {
    respond(ensure_form(form_id, form_json).and_then(|spec| {
        let submission: Submission = parse("submission", body_json)?;
        let validation = validate(&spec, &submission);
        if !validation.valid {
            debug!(form = %spec.id, "rejected submission");
            return Ok(json!({
                "status": STATUS_BAD_REQUEST,
                "accepted": false,
                "validation": encode(&validation)?,
            }));
        }
        let email = submission.email.clone();
        let response = submission.into_response();
        info!(form = %spec.id, "accepted submission");
        Ok(json!({
            "status": STATUS_CREATED,
            "accepted": true,
            "email": email,
            "response": encode(&response)?,
        }))
    }))
}

/// Aggregates stored responses into the `{name, value}` points a chart draws.
pub fn chart_series(chart_json: &str, responses_json: &str) -> String {
    respond(series_payload(chart_json, responses_json))
}

fn series_payload(chart_json: &str, responses_json: &str) -> Result<Value, ComponentError> {
    let chart: ChartSpec = parse("chart", chart_json)?;
    let responses: Vec<StoredResponse> = parse("responses", responses_json)?;
    let series = aggregate(&chart, &responses);
    Ok(json!({
        "title": chart.title,
        "chartType": chart.chart_type,
        "empty": series.is_empty(),
        "series": series,
    }))
}

/// Runs one agent tool call and returns the result plus the updated board.
pub fn apply_tool(
    form_id: &str,
    form_json: &str,
    responses_json: &str,
    board_json: &str,
    call_json: &str,
) -> String {
    respond(ensure_form(form_id, form_json).and_then(|spec| {
        let responses: Vec<StoredResponse> = parse("responses", responses_json)?;
        let mut board: ChartBoard = if board_json.trim().is_empty() {
            ChartBoard::default()
        } else {
            parse("board", board_json)?
        };
        let invocation: ToolInvocation = parse("tool call", call_json)?;
        let call = ToolCall::try_from(invocation)?;
        let result = board.apply(&call, &spec, &responses)?;
        Ok(json!({ "result": result, "board": encode(&board)? }))
    }))
}
