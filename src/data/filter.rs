//! Categorical filter operators and the persisted filter/query shapes.
//!
//! A filter names a column (`property`), an operator and an optional value.
//! Operators are stored as snake_case strings so that views written by other
//! front ends stay readable; an operator string we do not know is an error,
//! not a silent pass-through.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::data::datatable::DataValue;
use crate::data::datavalue_compare::{compare_datavalues, datavalues_equal};

/// Predicate over a single column value
pub type ValuePredicate = Box<dyn Fn(&DataValue) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Empty,
    NotEmpty,
}

impl FilterOp {
    pub const ALL: [FilterOp; 14] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Contains,
        FilterOp::NotContains,
        FilterOp::StartsWith,
        FilterOp::EndsWith,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::Empty,
        FilterOp::NotEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Contains => "contains",
            FilterOp::NotContains => "not_contains",
            FilterOp::StartsWith => "starts_with",
            FilterOp::EndsWith => "ends_with",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Empty => "empty",
            FilterOp::NotEmpty => "not_empty",
        }
    }

    /// Whether the operator reads `value` at all
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOp::Empty | FilterOp::NotEmpty)
    }

    /// Build a value predicate for this operator.
    ///
    /// Errors when the value is missing or has the wrong shape for the
    /// operator (`in`/`not_in` need an array, comparisons need a scalar).
    pub fn build_filter(
        &self,
        value: Option<&JsonValue>,
        case_insensitive: bool,
    ) -> Result<ValuePredicate> {
        let op = *self;
        match op {
            FilterOp::Empty => Ok(Box::new(|v: &DataValue| v.is_empty())),
            FilterOp::NotEmpty => Ok(Box::new(|v: &DataValue| !v.is_empty())),
            FilterOp::In | FilterOp::NotIn => {
                let value = required(op, value)?;
                let items = value
                    .as_array()
                    .ok_or_else(|| anyhow!("Filter operator '{}' expects an array value", op))?;
                let wanted: Vec<DataValue> = items.iter().map(DataValue::from_json).collect();
                let negate = op == FilterOp::NotIn;
                Ok(Box::new(move |v: &DataValue| {
                    let found = wanted
                        .iter()
                        .any(|w| datavalues_equal(v, w, case_insensitive));
                    found != negate
                }))
            }
            FilterOp::Contains | FilterOp::NotContains | FilterOp::StartsWith | FilterOp::EndsWith => {
                let needle = scalar(op, required(op, value)?)?.to_string();
                let needle = if case_insensitive {
                    needle.to_lowercase()
                } else {
                    needle
                };
                Ok(Box::new(move |v: &DataValue| {
                    let text = if case_insensitive {
                        v.to_string().to_lowercase()
                    } else {
                        v.to_string()
                    };
                    match op {
                        FilterOp::Contains => text.contains(&needle),
                        FilterOp::NotContains => !text.contains(&needle),
                        FilterOp::StartsWith => text.starts_with(&needle),
                        _ => text.ends_with(&needle),
                    }
                }))
            }
            FilterOp::Eq | FilterOp::Neq => {
                let target = scalar(op, required(op, value)?)?;
                let negate = op == FilterOp::Neq;
                Ok(Box::new(move |v: &DataValue| {
                    datavalues_equal(v, &target, case_insensitive) != negate
                }))
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let target = scalar(op, required(op, value)?)?;
                Ok(Box::new(move |v: &DataValue| {
                    if v.is_null() {
                        return false;
                    }
                    let ord = compare_datavalues(v, &target);
                    match op {
                        FilterOp::Gt => ord == Ordering::Greater,
                        FilterOp::Gte => ord != Ordering::Less,
                        FilterOp::Lt => ord == Ordering::Less,
                        _ => ord != Ordering::Greater,
                    }
                }))
            }
        }
    }
}

fn required(op: FilterOp, value: Option<&JsonValue>) -> Result<&JsonValue> {
    value.ok_or_else(|| anyhow!("Filter operator '{}' requires a value", op))
}

fn scalar(op: FilterOp, value: &JsonValue) -> Result<DataValue> {
    if value.is_array() || value.is_object() {
        bail!("Filter operator '{}' expects a scalar value", op);
    }
    Ok(DataValue::from_json(value))
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        FilterOp::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown filter operator '{}'", s))
    }
}

/// A categorical filter as persisted in a view. Filters can be toggled off
/// (`disable`) without being deleted, and may be incomplete while a user is
/// still editing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub disable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl FilterSpec {
    pub fn new(property: impl Into<String>, op: FilterOp, value: Option<JsonValue>) -> Self {
        Self {
            disable: false,
            property: Some(property.into()),
            op: Some(op.as_str().to_string()),
            value,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disable = true;
        self
    }

    /// Enabled and with both a column and an operator chosen
    pub fn is_active(&self) -> bool {
        !self.disable && self.property.is_some() && self.op.is_some()
    }
}

/// A structured query clause of a view. Always enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryClause {
    pub property: String,
    pub op: String,
    #[serde(default)]
    pub value: JsonValue,
}

impl QueryClause {
    pub fn new(property: impl Into<String>, op: FilterOp, value: JsonValue) -> Self {
        Self {
            property: property.into(),
            op: op.as_str().to_string(),
            value,
        }
    }

    pub fn as_filter(&self) -> FilterSpec {
        FilterSpec {
            disable: false,
            property: Some(self.property.clone()),
            op: Some(self.op.clone()),
            value: Some(self.value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> DataValue {
        DataValue::String(s.to_string())
    }

    #[test]
    fn test_parse_operator() {
        assert_eq!("eq".parse::<FilterOp>().unwrap(), FilterOp::Eq);
        assert_eq!("NOT_IN".parse::<FilterOp>().unwrap(), FilterOp::NotIn);
        let err = "between".parse::<FilterOp>().unwrap_err();
        assert!(err.to_string().contains("Unknown filter operator"));
    }

    #[test]
    fn test_eq_and_neq() {
        let eq = FilterOp::Eq.build_filter(Some(&json!("open")), true).unwrap();
        assert!(eq(&text("Open")));
        assert!(!eq(&text("closed")));

        let neq = FilterOp::Neq.build_filter(Some(&json!(3)), true).unwrap();
        assert!(neq(&DataValue::Integer(4)));
        assert!(!neq(&DataValue::Float(3.0)));
    }

    #[test]
    fn test_in_requires_array() {
        assert!(FilterOp::In.build_filter(Some(&json!("a")), true).is_err());

        let pred = FilterOp::In.build_filter(Some(&json!(["a", "b"])), true).unwrap();
        assert!(pred(&text("B")));
        assert!(!pred(&text("c")));

        let pred = FilterOp::NotIn.build_filter(Some(&json!([1, 2])), true).unwrap();
        assert!(pred(&DataValue::Integer(3)));
        assert!(!pred(&DataValue::Integer(2)));
    }

    #[test]
    fn test_comparisons() {
        let gt = FilterOp::Gt.build_filter(Some(&json!(10)), true).unwrap();
        assert!(gt(&DataValue::Float(10.5)));
        assert!(!gt(&DataValue::Integer(10)));
        assert!(!gt(&DataValue::Null));

        let lte = FilterOp::Lte.build_filter(Some(&json!(10)), true).unwrap();
        assert!(lte(&DataValue::Integer(10)));
        assert!(!lte(&DataValue::Integer(11)));

        assert!(FilterOp::Gt.build_filter(Some(&json!([1])), true).is_err());
    }

    #[test]
    fn test_text_operators() {
        let starts = FilterOp::StartsWith
            .build_filter(Some(&json!("ab")), true)
            .unwrap();
        assert!(starts(&text("ABC")));
        let ends = FilterOp::EndsWith.build_filter(Some(&json!("bc")), false).unwrap();
        assert!(ends(&text("abc")));
        assert!(!ends(&text("aBC")));
        let not_contains = FilterOp::NotContains
            .build_filter(Some(&json!("x")), true)
            .unwrap();
        assert!(not_contains(&text("abc")));
    }

    #[test]
    fn test_missing_value_is_error() {
        assert!(FilterOp::Contains.build_filter(None, true).is_err());
        let empty = FilterOp::Empty.build_filter(None, true).unwrap();
        assert!(empty(&DataValue::Null));
        assert!(empty(&text("  ")));
        assert!(!empty(&text("x")));
    }

    #[test]
    fn test_filter_spec_serde_shape() {
        let spec = FilterSpec::new("status", FilterOp::Eq, Some(json!("open")));
        let encoded = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            encoded,
            json!({"disable": false, "property": "status", "op": "eq", "value": "open"})
        );
        let draft: FilterSpec = serde_json::from_value(json!({"disable": false})).unwrap();
        assert!(!draft.is_active());
    }
}
