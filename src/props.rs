//! Property diffing between two renders of the same node
use crate::types::{PropValue, Props};
use serde::{Deserialize, Serialize};

/// How two values of the same kind are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparePolicy {
    /// Every kind has an equality rule.
    #[default]
    Structural,
    /// Only strings and booleans are compared; any other value present in the
    /// new map is reported as changed even when equal. Matches the reference
    /// comparator for consumers that depend on its update pattern.
    StringBool,
}

/// Compares two values, treating NaN as equal to NaN.
pub fn prop_eq(a: &PropValue, b: &PropValue) -> bool {
    match (a, b) {
        (PropValue::Null, PropValue::Null) => true,
        (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
        (PropValue::Int(a), PropValue::Int(b)) => a == b,
        (PropValue::Float(a), PropValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        (PropValue::Str(a), PropValue::Str(b)) => a == b,
        (PropValue::Opaque(a), PropValue::Opaque(b)) => a == b,
        (PropValue::List(a), PropValue::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| prop_eq(a, b))
        }
        (PropValue::Map(a), PropValue::Map(b)) => {
            // Key order is not significant.
            a.len() == b.len()
                && a.iter().all(|(k, a_value)| b.get(k).is_some_and(|b_value| prop_eq(a_value, b_value)))
        }
        _ => false,
    }
}

fn changed(old: &PropValue, new: &PropValue, policy: ComparePolicy) -> bool {
    if old.kind() != new.kind() {
        return true;
    }
    match policy {
        ComparePolicy::Structural => !prop_eq(old, new),
        ComparePolicy::StringBool => match (old, new) {
            (PropValue::Str(a), PropValue::Str(b)) => a != b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a != b,
            _ => true,
        },
    }
}

/// Returns the changed subset of `new`, or `None` when nothing changed.
///
/// Added and changed keys carry their new value; keys only present in `old`
/// carry [`PropValue::Null`].
pub fn diff_props(old: &Props, new: &Props, policy: ComparePolicy) -> Option<Props> {
    let mut changes = Props::new();

    for (key, new_value) in new {
        let is_changed = match old.get(key) {
            Some(old_value) => changed(old_value, new_value, policy),
            None => true,
        };
        if is_changed {
            changes.insert(key.clone(), new_value.clone());
        }
    }

    for key in old.keys() {
        if !new.contains_key(key) {
            changes.insert(key.clone(), PropValue::Null);
        }
    }

    if changes.is_empty() { None } else { Some(changes) }
}

/// String property, or `default` when missing or of another kind.
pub fn str_prop_or<'a>(props: &'a Props, key: &str, default: &'a str) -> &'a str {
    props.get(key).and_then(PropValue::as_str).unwrap_or(default)
}

pub fn bool_prop_or(props: &Props, key: &str, default: bool) -> bool {
    props.get(key).and_then(PropValue::as_bool).unwrap_or(default)
}

pub fn int_prop_or(props: &Props, key: &str, default: i64) -> i64 {
    props.get(key).and_then(PropValue::as_i64).unwrap_or(default)
}
