use serde_json::Value;
use tracing::warn;

use crate::logic::{evaluation_order, should_show};
use crate::spec::form::FormSpec;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    /// Every field is judged against the raw answers, in one top-to-bottom pass.
    #[default]
    Direct,
    /// Fields are judged in dependency order and hidden fields' answers are
    /// dropped before their dependents are evaluated.
    Cascade,
}

pub fn resolve_visibility(spec: &FormSpec, answers: &Value, mode: VisibilityMode) -> VisibilityMap {
    match mode {
        VisibilityMode::Direct => resolve_direct(spec, answers),
        VisibilityMode::Cascade => match evaluation_order(spec) {
            Ok(order) => resolve_cascade(spec, answers, &order),
            Err(issue) => {
                warn!(form = %spec.id, %issue, "falling back to direct visibility");
                resolve_direct(spec, answers)
            }
        },
    }
}

fn resolve_direct(spec: &FormSpec, answers: &Value) -> VisibilityMap {
    spec.fields
        .iter()
        .map(|field| (field.id.clone(), should_show(field, answers)))
        .collect()
}

fn resolve_cascade(spec: &FormSpec, answers: &Value, order: &[usize]) -> VisibilityMap {
    let mut effective = Value::Object(answers.as_object().cloned().unwrap_or_default());
    let mut map = VisibilityMap::new();

    for &index in order {
        let field = &spec.fields[index];
        let visible = should_show(field, &effective);
        if !visible && let Some(remaining) = effective.as_object_mut() {
            remaining.remove(&field.id);
        }
        map.insert(field.id.clone(), visible);
    }

    map
}

/// Convenience lookup that treats unknown ids as visible.
pub fn is_visible(map: &VisibilityMap, id: &str) -> bool {
    map.get(id).copied().unwrap_or(true)
}
