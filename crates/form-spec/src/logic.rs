use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::spec::{
    field::{Condition, ConditionOperator, FieldSpec, FieldType, LogicType},
    form::FormSpec,
};
use crate::validate::compile_pattern;

/// Problems found in the conditional rules of a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicIssue {
    #[error("field '{field}' depends on unknown field '{reference}'")]
    UnknownField { field: String, reference: String },
    #[error("field '{field}' depends on itself")]
    SelfReference { field: String },
    #[error("field '{field}' depends on '{reference}', which does not come before it")]
    ForwardReference { field: String, reference: String },
    #[error("field '{field}' depends on '{reference}' of type {kind}, which has no options")]
    NotChoiceField {
        field: String,
        reference: String,
        kind: &'static str,
    },
    #[error("field '{field}' uses 'contains' on single-valued field '{reference}'")]
    ContainsOnSingleValue { field: String, reference: String },
    #[error("field '{field}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },
    #[error("conditional rules form a cycle through: {}", .fields.join(", "))]
    Cycle { fields: Vec<String> },
}

impl Condition {
    /// Tests this condition against the answer currently stored for its field.
    ///
    /// A missing (or null) answer never matches, whatever the operator.
    pub fn matches(&self, answers: &Value) -> bool {
        let Some(answer) = answers.get(&self.field_id).filter(|value| !value.is_null()) else {
            return false;
        };
        match self.operator {
            ConditionOperator::Equals => self.equals(answer),
            ConditionOperator::NotEquals => !self.equals(answer),
            ConditionOperator::Contains => answer
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
        }
    }

    fn equals(&self, answer: &Value) -> bool {
        match answer {
            Value::Array(items) => items.contains(&self.value),
            scalar => scalar == &self.value,
        }
    }
}

/// Decides whether `field` is shown (and so enforced) for the given answers.
///
/// Pure over the answer set: chains are not resolved recursively, a referenced
/// field that is itself hidden is judged on whatever answer it still carries.
pub fn should_show(field: &FieldSpec, answers: &Value) -> bool {
    let Some(logic) = field.active_logic() else {
        return true;
    };
    let mut results = logic
        .conditions
        .iter()
        .map(|condition| condition.matches(answers));
    match logic.logic_type {
        LogicType::And => results.all(|matched| matched),
        LogicType::Or => results.any(|matched| matched),
    }
}

/// Lints every enabled rule of the form against the field ordering invariant,
/// along with `pattern` constraints that do not compile.
pub fn check_logic(form: &FormSpec) -> Vec<LogicIssue> {
    let mut issues = Vec::new();

    for (index, field) in form.fields.iter().enumerate() {
        if let Some(pattern) = field
            .validation
            .as_ref()
            .and_then(|constraint| constraint.pattern.as_ref())
            && let Err(err) = compile_pattern(pattern)
        {
            issues.push(LogicIssue::InvalidPattern {
                field: field.id.clone(),
                pattern: pattern.clone(),
                reason: err.to_string(),
            });
        }
        let Some(logic) = field.conditional_logic.as_ref().filter(|logic| logic.enabled) else {
            continue;
        };
        for condition in &logic.conditions {
            let reference = &condition.field_id;
            if reference == &field.id {
                issues.push(LogicIssue::SelfReference {
                    field: field.id.clone(),
                });
                continue;
            }
            let Some(position) = form.position(reference) else {
                issues.push(LogicIssue::UnknownField {
                    field: field.id.clone(),
                    reference: reference.clone(),
                });
                continue;
            };
            if position > index {
                issues.push(LogicIssue::ForwardReference {
                    field: field.id.clone(),
                    reference: reference.clone(),
                });
            }
            let source = &form.fields[position];
            if !source.kind.is_choice() {
                issues.push(LogicIssue::NotChoiceField {
                    field: field.id.clone(),
                    reference: reference.clone(),
                    kind: source.kind.as_str(),
                });
            } else if condition.operator == ConditionOperator::Contains
                && source.kind != FieldType::Checkbox
            {
                issues.push(LogicIssue::ContainsOnSingleValue {
                    field: field.id.clone(),
                    reference: reference.clone(),
                });
            }
        }
    }

    if let Err(cycle) = evaluation_order(form) {
        issues.push(cycle);
    }

    issues
}

/// Orders field indexes so every field comes after the fields its rule reads.
///
/// Ties keep the authored order, so a well-formed form yields `0..n`.
pub fn evaluation_order(form: &FormSpec) -> Result<Vec<usize>, LogicIssue> {
    let count = form.fields.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pending = vec![0usize; count];

    for (index, field) in form.fields.iter().enumerate() {
        let Some(logic) = field.active_logic() else {
            continue;
        };
        let sources: BTreeSet<usize> = logic
            .conditions
            .iter()
            .filter_map(|condition| form.position(&condition.field_id))
            .collect();
        for source in sources {
            dependents[source].push(index);
            pending[index] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|index| pending[*index] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &dependent in &dependents[index] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        let fields = (0..count)
            .filter(|index| pending[*index] > 0)
            .map(|index| form.fields[index].id.clone())
            .collect();
        Err(LogicIssue::Cycle { fields })
    }
}
