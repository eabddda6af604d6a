use serde_json::{Map, Value, json};

use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::{FormMode, FormSpec};
use crate::validate::compile_pattern;
use crate::visibility::{VisibilityMap, is_visible};

/// Generates an answers JSON schema restricted to the visible fields.
///
/// Only rules `validate` enforces are emitted: code-mode fields are untyped and
/// patterns that fail to compile are left out.
pub fn generate(spec: &FormSpec, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &spec.fields {
        if !is_visible(visibility, &field.id) {
            continue;
        }
        let schema = match spec.mode {
            FormMode::Visual => field_schema(field),
            FormMode::Code => json!({ "title": field.label }),
        };
        properties.insert(field.id.clone(), schema);
        if field.required {
            required.push(Value::String(field.id.clone()));
        }
    }

    let mut root = Map::new();
    root.insert("type".into(), Value::String("object".into()));
    root.insert("title".into(), Value::String(spec.title.clone()));
    root.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        root.insert("required".into(), Value::Array(required));
    }
    root.insert(
        "additionalProperties".into(),
        Value::Bool(spec.mode == FormMode::Code),
    );

    Value::Object(root)
}

fn field_schema(field: &FieldSpec) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), Value::String(field.label.clone()));
    let options = || {
        Value::Array(
            field
                .options
                .iter()
                .map(|option| Value::String(option.clone()))
                .collect(),
        )
    };

    match field.kind {
        FieldType::Text | FieldType::Textarea => {
            schema.insert("type".into(), json!("string"));
        }
        FieldType::Email => {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("email"));
        }
        FieldType::Date => {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("date"));
        }
        FieldType::Number => {
            schema.insert("type".into(), json!(["number", "string"]));
        }
        FieldType::Select | FieldType::Radio => {
            schema.insert("type".into(), json!("string"));
            schema.insert("enum".into(), options());
        }
        FieldType::Checkbox => {
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), json!({ "type": "string", "enum": options() }));
            schema.insert("uniqueItems".into(), Value::Bool(true));
        }
    }

    if let Some(constraint) = &field.validation {
        if let Some(pattern) = &constraint.pattern
            && compile_pattern(pattern).is_ok()
        {
            schema.insert("pattern".into(), Value::String(pattern.clone()));
        }
        if let Some(min_length) = constraint.min_length {
            schema.insert("minLength".into(), json!(min_length));
        }
        if let Some(max_length) = constraint.max_length {
            schema.insert("maxLength".into(), json!(max_length));
        }
        if let Some(min) = constraint.min {
            schema.insert("minimum".into(), json!(min));
        }
        if let Some(max) = constraint.max {
            schema.insert("maximum".into(), json!(max));
        }
    }

    Value::Object(schema)
}
