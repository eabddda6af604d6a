use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
        }
    }
}

/// Reduction applied to every category bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationType::Count => "count",
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
        }
    }

    pub fn needs_y_axis(self) -> bool {
        !matches!(self, AggregationType::Count)
    }
}

/// User-authored chart configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub title: String,
    pub chart_type: ChartType,
    pub x_axis_field: String,
    #[serde(default)]
    pub y_axis_field: Option<String>,
    #[serde(default)]
    pub aggregation_type: AggregationType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartSpecError {
    #[error("chart '{0}' has no x-axis field")]
    MissingXAxis(String),
    #[error("chart '{title}' uses {aggregation:?} aggregation without a y-axis field")]
    MissingYAxis {
        title: String,
        aggregation: AggregationType,
    },
}

impl ChartSpec {
    /// Enforces the persisted invariants of a chart definition.
    pub fn check(&self) -> Result<(), ChartSpecError> {
        if self.x_axis_field.trim().is_empty() {
            return Err(ChartSpecError::MissingXAxis(self.title.clone()));
        }
        let has_y = self
            .y_axis_field
            .as_deref()
            .is_some_and(|field| !field.trim().is_empty());
        if self.aggregation_type.needs_y_axis() && !has_y {
            return Err(ChartSpecError::MissingYAxis {
                title: self.title.clone(),
                aggregation: self.aggregation_type,
            });
        }
        Ok(())
    }
}
