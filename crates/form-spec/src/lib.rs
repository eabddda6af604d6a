#![allow(missing_docs)]

pub mod aggregate;
pub mod answers;
pub mod answers_schema;
pub mod logic;
pub mod render;
pub mod spec;
pub mod tools;
pub mod validate;
pub mod visibility;

pub use aggregate::{NO_ANSWER_LABEL, Series, SeriesPoint, aggregate};
pub use answers::{StoredResponse, Submission, ValidationError, ValidationResult};
pub use answers_schema::generate as answers_schema;
pub use logic::{LogicIssue, check_logic, evaluation_order, should_show};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_series_text, render_text,
};
pub use spec::{
    AggregationType, ChartSpec, ChartSpecError, ChartType, Condition, ConditionOperator,
    ConditionalLogic, FieldConstraint, FieldSpec, FieldType, FormMode, FormSpec, LogicType,
};
pub use tools::{ChartBoard, ChartPatch, StoredChart, ToolCall, ToolError, ToolInvocation};
pub use validate::validate;
pub use visibility::{VisibilityMap, VisibilityMode, resolve_visibility};
