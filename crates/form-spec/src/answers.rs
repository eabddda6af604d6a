use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value};

/// Key under which the designer historically nested structured answers.
pub const NESTED_VALUES_KEY: &str = "values";

/// Body of a public form submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub answers: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<BTreeMap<String, String>>,
}

impl Submission {
    pub fn answers_value(&self) -> Value {
        Value::Object(self.answers.clone())
    }

    /// Converts an accepted submission into its normalized stored shape.
    pub fn into_response(self) -> StoredResponse {
        let url_params = self.url_params.map(|params| {
            Value::Object(
                params
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            )
        });
        StoredResponse {
            answers: Value::Object(self.answers),
            url_params,
        }
        .normalize()
    }
}

/// One persisted response row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    #[serde(default)]
    pub answers: Value,
    #[serde(default)]
    pub url_params: Option<Value>,
}

fn defined(value: &&Value) -> bool {
    !value.is_null()
}

impl StoredResponse {
    pub fn new(answers: Value) -> Self {
        Self {
            answers,
            url_params: None,
        }
    }

    pub fn with_url_params(mut self, url_params: Value) -> Self {
        self.url_params = Some(url_params);
        self
    }

    /// Resolves `key` through the nested `values` map, then the flat answers,
    /// then the captured URL parameters. The first non-null hit wins.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.answers
            .get(NESTED_VALUES_KEY)
            .and_then(|values| values.get(key))
            .filter(defined)
            .or_else(|| self.answers.get(key).filter(defined))
            .or_else(|| {
                self.url_params
                    .as_ref()
                    .and_then(|params| params.get(key))
                    .filter(defined)
            })
    }

    /// Collapses the three answer sources into one flat map so that every key
    /// resolves identically through [`StoredResponse::lookup`] afterwards.
    pub fn normalize(self) -> Self {
        let mut flat = Map::new();

        if let Some(Value::Object(params)) = &self.url_params {
            merge_defined(&mut flat, params);
        }
        if let Value::Object(answers) = &self.answers {
            for (key, value) in answers {
                if key == NESTED_VALUES_KEY && value.is_object() {
                    continue;
                }
                if !value.is_null() {
                    flat.insert(key.clone(), value.clone());
                }
            }
            if let Some(Value::Object(nested)) = answers.get(NESTED_VALUES_KEY) {
                merge_defined(&mut flat, nested);
                // Kept whole: lookup reads it first for every key, and it is what
                // the `values` key itself resolved to.
                flat.insert(NESTED_VALUES_KEY.to_string(), Value::Object(nested.clone()));
            }
        }

        Self {
            answers: Value::Object(flat),
            url_params: self.url_params,
        }
    }

    /// Serializes the response as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }
}

fn merge_defined(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if !value.is_null() {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Validation error metadata reported for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result returned from `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}
