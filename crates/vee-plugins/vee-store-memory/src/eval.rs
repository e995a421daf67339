//! Evaluation of the typed filter and sort values against JSON records.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use vee_core::{Filter, Literal, Sort};

pub(crate) type Row = Map<String, Value>;

pub(crate) fn matches(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::Eq(field, literal) => equals(lookup(row, field), literal),
        Filter::Contains(field, needle) => contains(lookup(row, field), needle),
        Filter::And(parts) => parts.iter().all(|part| matches(part, row)),
        Filter::Or(parts) => parts.iter().any(|part| matches(part, row)),
    }
}

/// `author.id` addresses the relation id itself, i.e. `author`.
fn lookup<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    let field = field.strip_suffix(".id").unwrap_or(field);
    let mut parts = field.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Missing fields compare as their zero value (`""`, `false`).
fn equals(value: Option<&Value>, literal: &Literal) -> bool {
    match (literal, value) {
        (Literal::Str(expected), Some(Value::String(actual))) => actual == expected,
        (Literal::Str(expected), None | Some(Value::Null)) => expected.is_empty(),
        (Literal::Bool(expected), Some(Value::Bool(actual))) => actual == expected,
        (Literal::Bool(expected), None | Some(Value::Null)) => !expected,
        _ => false,
    }
}

/// Case-insensitive substring on text, exact membership on id lists.
fn contains(value: Option<&Value>, needle: &str) -> bool {
    match value {
        Some(Value::String(text)) => text.to_lowercase().contains(&needle.to_lowercase()),
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(needle)),
        _ => false,
    }
}

/// Stable: rows equal on every key keep their insertion order.
pub(crate) fn sort(rows: &mut [Row], keys: &[Sort]) {
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let order = compare(a.get(&key.field), b.get(&key.field));
                if key.descending {
                    order.reverse()
                } else {
                    order
                }
            })
            .find(|order| order.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
