use crate::data::datatable::DataValue;
use std::cmp::Ordering;

/// Total order over cell values, used as the default column comparator.
///
/// Order across types: Null < Boolean < numbers < String < DateTime.
/// Integers and floats compare by numeric value.
pub fn compare_datavalues(a: &DataValue, b: &DataValue) -> Ordering {
    match (a, b) {
        (DataValue::Integer(a), DataValue::Integer(b)) => a.cmp(b),
        (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (DataValue::Integer(i), DataValue::Float(f)) => {
            (*i as f64).partial_cmp(f).unwrap_or(Ordering::Equal)
        }
        (DataValue::Float(f), DataValue::Integer(i)) => {
            f.partial_cmp(&(*i as f64)).unwrap_or(Ordering::Equal)
        }
        (DataValue::String(a), DataValue::String(b)) => a.cmp(b),
        (DataValue::Boolean(a), DataValue::Boolean(b)) => a.cmp(b),
        (DataValue::DateTime(a), DataValue::DateTime(b)) => a.cmp(b),

        (DataValue::Null, DataValue::Null) => Ordering::Equal,
        (DataValue::Null, _) => Ordering::Less,
        (_, DataValue::Null) => Ordering::Greater,

        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &DataValue) -> u8 {
    match value {
        DataValue::Null => 0,
        DataValue::Boolean(_) => 1,
        DataValue::Integer(_) | DataValue::Float(_) => 2,
        DataValue::String(_) => 3,
        DataValue::DateTime(_) => 4,
    }
}

/// Compare DataValues with optional values (handling None)
pub fn compare_optional_datavalues(a: Option<&DataValue>, b: Option<&DataValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_datavalues(a, b),
    }
}

/// Loose equality used by filters: numbers compare numerically, everything
/// else by its displayed text.
pub fn datavalues_equal(a: &DataValue, b: &DataValue, case_insensitive: bool) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    match (a, b) {
        (DataValue::Null, DataValue::Null) => true,
        (DataValue::Null, _) | (_, DataValue::Null) => false,
        _ => {
            let (left, right) = (a.to_string(), b.to_string());
            if case_insensitive {
                left.eq_ignore_ascii_case(&right)
            } else {
                left == right
            }
        }
    }
}
