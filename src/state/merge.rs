//! Shallow merge of partial updates.

use crate::types::{Accumulated, ActionName, StateValue};
use serde_json::{Map, Value};

/// Merge `partial` over `base` one level deep.
///
/// Keys present in `partial` overwrite `base`; all other keys are kept.
pub fn shallow_merge(base: &Map<String, Value>, partial: Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in partial {
        merged.insert(key, value);
    }
    merged
}

/// Merge two JSON values.
///
/// Objects merge shallowly. Any other partial replaces the base.
pub fn shallow_merge_value(base: &Value, partial: Value) -> Value {
    match (base, partial) {
        (Value::Object(base), Value::Object(partial)) => Value::Object(shallow_merge(base, partial)),
        (_, partial) => partial,
    }
}

/// One step of the update pipeline's left fold.
pub fn merge_step<S: StateValue>(
    current: &Accumulated<S>,
    partial: S::Partial,
    action_name: ActionName,
) -> Accumulated<S> {
    Accumulated {
        action_name,
        state: current.state.merge(partial),
    }
}

/// Fold a sequence of updates onto an initial state, in order.
///
/// This is the reference the live pipeline must agree with.
pub fn fold_updates<S, I>(initial: S, updates: I) -> Accumulated<S>
where
    S: StateValue,
    I: IntoIterator<Item = (S::Partial, ActionName)>,
{
    updates
        .into_iter()
        .fold(Accumulated::seed(initial), |acc, (partial, action_name)| {
            merge_step(&acc, partial, action_name)
        })
}
