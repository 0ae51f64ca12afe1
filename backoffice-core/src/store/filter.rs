//! Filter expressions understood by every [`RecordStore`](super::RecordStore) backend.
//!
//! A filter is a conjunction of per-field conditions. Values are plain JSON;
//! dates are expected in ISO `YYYY-MM-DD` form so that range comparisons can
//! be performed lexicographically.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Eq, value)
    }

    pub fn gt(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Gt, value)
    }

    pub fn gte(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Gte, value)
    }

    pub fn lt(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Lt, value)
    }

    pub fn lte(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Lte, value)
    }

    /// Membership test: the field must equal one of the given values.
    pub fn is_in<T: Serialize>(self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<Value> = values
            .into_iter()
            .map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
            .collect();
        self.push(field, FilterOp::In, Value::Array(values))
    }

    fn push(mut self, field: &str, op: FilterOp, value: impl Serialize) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            op,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate the filter against a JSON row. Missing fields are treated
    /// as null; incomparable values never match a range condition.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|cond| {
            let actual = row.get(&cond.field).unwrap_or(&Value::Null);
            match cond.op {
                FilterOp::Eq => actual == &cond.value,
                FilterOp::In => cond
                    .value
                    .as_array()
                    .is_some_and(|set| set.contains(actual)),
                FilterOp::Gt => compare(actual, &cond.value) == Some(Ordering::Greater),
                FilterOp::Gte => matches!(
                    compare(actual, &cond.value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                FilterOp::Lt => compare(actual, &cond.value) == Some(Ordering::Less),
                FilterOp::Lte => matches!(
                    compare(actual, &cond.value),
                    Some(Ordering::Less | Ordering::Equal)
                ),
            }
        })
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}
