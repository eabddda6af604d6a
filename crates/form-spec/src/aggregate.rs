use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::answers::StoredResponse;
use crate::spec::chart::{AggregationType, ChartSpec};

/// Category used for responses that carry no x-axis value.
pub const NO_ANSWER_LABEL: &str = "Sin respuesta";

/// Separator used when a multi-select answer becomes one category label.
pub const MULTI_VALUE_SEPARATOR: &str = ", ";

/// One rendered point of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesPoint {
    pub name: String,
    pub value: f64,
}

pub type Series = Vec<SeriesPoint>;

#[derive(Debug, Default)]
struct Bucket {
    name: String,
    total: f64,
    samples: u64,
    extreme: Option<f64>,
}

impl Bucket {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn record(&mut self, aggregation: AggregationType, y: Option<f64>) {
        match aggregation {
            AggregationType::Count => self.total += 1.0,
            AggregationType::Sum => self.total += y.unwrap_or(0.0),
            AggregationType::Avg => {
                if let Some(y) = y {
                    self.total += y;
                    self.samples += 1;
                }
            }
            AggregationType::Min => {
                if let Some(y) = y {
                    self.extreme = Some(self.extreme.map_or(y, |current| current.min(y)));
                }
            }
            AggregationType::Max => {
                if let Some(y) = y {
                    self.extreme = Some(self.extreme.map_or(y, |current| current.max(y)));
                }
            }
        }
    }

    fn finish(self, aggregation: AggregationType) -> SeriesPoint {
        let value = match aggregation {
            AggregationType::Count | AggregationType::Sum => self.total,
            AggregationType::Avg if self.samples > 0 => self.total / self.samples as f64,
            AggregationType::Avg => 0.0,
            AggregationType::Min | AggregationType::Max => self.extreme.unwrap_or(0.0),
        };
        SeriesPoint {
            name: self.name,
            value,
        }
    }
}

/// Groups responses by the chart's x-axis value and reduces each group.
///
/// Categories keep the order in which they were first seen. If no response
/// resolves an x-axis value at all the series is empty.
pub fn aggregate(chart: &ChartSpec, responses: &[StoredResponse]) -> Series {
    let aggregation = chart.aggregation_type;
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut any_x = false;

    for response in responses {
        let name = match response.lookup(&chart.x_axis_field) {
            Some(value) => {
                any_x = true;
                category_label(value)
            }
            None => NO_ANSWER_LABEL.to_string(),
        };
        let y = chart
            .y_axis_field
            .as_deref()
            .filter(|_| aggregation.needs_y_axis())
            .and_then(|field| response.lookup(field))
            .map(y_value);

        let index = *positions.entry(name).or_insert_with_key(|name| {
            buckets.push(Bucket::new(name.clone()));
            buckets.len() - 1
        });
        buckets[index].record(aggregation, y);
    }

    if !any_x {
        trace!(chart = %chart.title, responses = responses.len(), "no x-axis values");
        return Series::new();
    }

    let series: Series = buckets
        .into_iter()
        .map(|bucket| bucket.finish(aggregation))
        .collect();
    trace!(chart = %chart.title, points = series.len(), "aggregated chart series");
    series
}

/// Display string for a grouping value; arrays become one joined label.
pub fn category_label(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(display)
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR),
        other => display(other),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        // `4.0` and `4` are the same category.
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

/// Numeric value of a y-axis answer; arrays contribute their first element.
fn y_value(value: &Value) -> f64 {
    match value {
        Value::Array(items) => items.first().map(coerce_number).unwrap_or(0.0),
        other => coerce_number(other),
    }
}

/// Numeric coercion with a zero fallback for anything non-numeric.
pub fn coerce_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    };
    if number.is_finite() { number } else { 0.0 }
}
