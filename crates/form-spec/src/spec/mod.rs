pub mod chart;
pub mod field;
pub mod form;

pub use chart::{AggregationType, ChartSpec, ChartSpecError, ChartType};
pub use field::{
    Condition, ConditionOperator, ConditionalLogic, FieldConstraint, FieldSpec, FieldType,
    LogicType,
};
pub use form::{FormMode, FormSpec};
