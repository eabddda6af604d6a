//! Tool-call contract between the chat agent and the chart board.
//!
//! Providers send `{ "name": ..., "arguments": ... }` where `arguments` is either
//! a JSON object or a JSON-encoded string. Calls are decoded into [`ToolCall`] and
//! applied to a [`ChartBoard`] together with the form and its responses.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::aggregate::aggregate;
use crate::answers::StoredResponse;
use crate::spec::chart::{AggregationType, ChartSpec, ChartSpecError, ChartType};
use crate::spec::form::{FormMode, FormSpec};

pub const DEFAULT_QUERY_LIMIT: usize = 50;
pub const MAX_QUERY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("chart '{0}' does not exist")]
    UnknownChart(String),
    #[error("form has no field '{0}'")]
    UnknownField(String),
    #[error(transparent)]
    Chart(#[from] ChartSpecError),
}

/// Raw call as emitted by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Partial update of a chart; absent keys keep their value, an empty
/// `yAxisField` clears it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<AggregationType>,
}

impl ChartPatch {
    fn apply_to(&self, chart: &ChartSpec) -> ChartSpec {
        let mut next = chart.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(chart_type) = self.chart_type {
            next.chart_type = chart_type;
        }
        if let Some(x_axis_field) = &self.x_axis_field {
            next.x_axis_field = x_axis_field.clone();
        }
        if let Some(y_axis_field) = &self.y_axis_field {
            next.y_axis_field = Some(y_axis_field.clone()).filter(|field| !field.is_empty());
        }
        if let Some(aggregation_type) = self.aggregation_type {
            next.aggregation_type = aggregation_type;
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    ListFields {},
    QueryResponses {
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SummarizeField {
        field: String,
    },
    ListCharts {},
    CreateChart {
        chart: ChartSpec,
    },
    UpdateChart {
        id: String,
        patch: ChartPatch,
    },
    DeleteChart {
        id: String,
    },
}

const TOOL_NAMES: [&str; 7] = [
    "list_fields",
    "query_responses",
    "summarize_field",
    "list_charts",
    "create_chart",
    "update_chart",
    "delete_chart",
];

impl TryFrom<ToolInvocation> for ToolCall {
    type Error = ToolError;

    fn try_from(invocation: ToolInvocation) -> Result<Self, Self::Error> {
        if !TOOL_NAMES.contains(&invocation.name.as_str()) {
            return Err(ToolError::UnknownTool(invocation.name));
        }
        let invalid = |source| ToolError::InvalidArguments {
            tool: invocation.name.clone(),
            source,
        };
        let arguments = match invocation.arguments {
            Value::Null => Value::Object(Map::new()),
            Value::String(text) if text.trim().is_empty() => Value::Object(Map::new()),
            Value::String(text) => serde_json::from_str(&text).map_err(invalid)?,
            other => other,
        };
        serde_json::from_value(json!({ "name": invocation.name, "arguments": arguments }))
            .map_err(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoredChart {
    pub id: String,
    #[serde(flatten)]
    pub spec: ChartSpec,
}

/// Charts attached to one form, as manipulated by the agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartBoard {
    #[serde(default)]
    pub charts: Vec<StoredChart>,
    #[serde(default)]
    pub next_id: u64,
}

impl ChartBoard {
    pub fn get(&self, id: &str) -> Option<&StoredChart> {
        self.charts.iter().find(|chart| chart.id == id)
    }

    /// Next free `chart-N` id. A missing or stale `nextId` is caught up to the
    /// highest suffix already on the board.
    fn allocate_id(&mut self) -> String {
        let highest = self
            .charts
            .iter()
            .filter_map(|chart| chart.id.strip_prefix("chart-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest);
        loop {
            self.next_id += 1;
            let id = format!("chart-{}", self.next_id);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Executes one tool call and returns the JSON result handed back to the model.
    pub fn apply(
        &mut self,
        call: &ToolCall,
        form: &FormSpec,
        responses: &[StoredResponse],
    ) -> Result<Value, ToolError> {
        debug!(form = %form.id, ?call, "applying tool call");
        match call {
            ToolCall::ListFields {} => Ok(Value::Array(
                form.fields
                    .iter()
                    .map(|field| {
                        json!({
                            "id": field.id,
                            "label": field.label,
                            "type": field.kind.as_str(),
                            "options": field.options,
                        })
                    })
                    .collect(),
            )),
            ToolCall::QueryResponses { field, limit } => {
                if let Some(field) = field {
                    ensure_field(form, field)?;
                }
                let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT);
                let rows = responses
                    .iter()
                    .take(limit)
                    .map(|response| match field {
                        Some(field) => response.lookup(field).cloned().unwrap_or(Value::Null),
                        None => response.clone().normalize().answers,
                    })
                    .collect::<Vec<_>>();
                Ok(json!({ "total": responses.len(), "rows": rows }))
            }
            ToolCall::SummarizeField { field } => {
                ensure_field(form, field)?;
                let chart = ChartSpec {
                    title: field.clone(),
                    chart_type: ChartType::Bar,
                    x_axis_field: field.clone(),
                    y_axis_field: None,
                    aggregation_type: AggregationType::Count,
                };
                Ok(json!({ "field": field, "series": aggregate(&chart, responses) }))
            }
            ToolCall::ListCharts {} => Ok(json!(self.charts)),
            ToolCall::CreateChart { chart } => {
                check_chart(form, chart)?;
                let stored = StoredChart {
                    id: self.allocate_id(),
                    spec: chart.clone(),
                };
                self.charts.push(stored.clone());
                Ok(json!(stored))
            }
            ToolCall::UpdateChart { id, patch } => {
                let slot = self
                    .charts
                    .iter_mut()
                    .find(|chart| &chart.id == id)
                    .ok_or_else(|| ToolError::UnknownChart(id.clone()))?;
                let updated = patch.apply_to(&slot.spec);
                check_chart(form, &updated)?;
                slot.spec = updated;
                Ok(json!(slot))
            }
            ToolCall::DeleteChart { id } => {
                let before = self.charts.len();
                self.charts.retain(|chart| &chart.id != id);
                if self.charts.len() == before {
                    return Err(ToolError::UnknownChart(id.clone()));
                }
                Ok(json!({ "deleted": id }))
            }
        }
    }
}

/// Code-mode forms accept arbitrary answer keys, so only visual forms are checked.
fn ensure_field(form: &FormSpec, field: &str) -> Result<(), ToolError> {
    if form.mode == FormMode::Visual && form.field(field).is_none() {
        return Err(ToolError::UnknownField(field.to_string()));
    }
    Ok(())
}

fn check_chart(form: &FormSpec, chart: &ChartSpec) -> Result<(), ToolError> {
    chart.check()?;
    ensure_field(form, &chart.x_axis_field)?;
    if let Some(y_axis_field) = &chart.y_axis_field {
        ensure_field(form, y_axis_field)?;
    }
    Ok(())
}

/// Function definitions advertised to the provider.
pub fn tool_definitions() -> Value {
    let chart_schema = serde_json::to_value(schema_for!(ChartSpec)).unwrap_or(Value::Null);
    let patch_schema = serde_json::to_value(schema_for!(ChartPatch)).unwrap_or(Value::Null);
    let empty = json!({ "type": "object", "properties": {} });
    let definitions = [
        (
            "list_fields",
            "List the fields of the form with their types and options.",
            empty.clone(),
        ),
        (
            "query_responses",
            "Read stored responses, optionally only one field's values.",
            json!({
                "type": "object",
                "properties": {
                    "field": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_QUERY_LIMIT }
                }
            }),
        ),
        (
            "summarize_field",
            "Count responses per distinct value of a field.",
            json!({
                "type": "object",
                "properties": { "field": { "type": "string" } },
                "required": ["field"]
            }),
        ),
        ("list_charts", "List the charts on the board.", empty),
        (
            "create_chart",
            "Add a chart to the board.",
            json!({
                "type": "object",
                "properties": { "chart": chart_schema },
                "required": ["chart"]
            }),
        ),
        (
            "update_chart",
            "Change some settings of an existing chart.",
            json!({
                "type": "object",
                "properties": { "id": { "type": "string" }, "patch": patch_schema },
                "required": ["id", "patch"]
            }),
        ),
        (
            "delete_chart",
            "Remove a chart from the board.",
            json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"]
            }),
        ),
    ];

    Value::Array(
        definitions
            .into_iter()
            .map(|(name, description, parameters)| {
                json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": description,
                        "parameters": parameters,
                    }
                })
            })
            .collect(),
    )
}
