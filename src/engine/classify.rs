use serde_json::Value;

use crate::row::Row;

/// Native numbers only. Numeric-looking strings stay strings.
pub fn is_numeric(value: &Value) -> bool {
    numeric_value(value).is_some()
}

pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|value| !value.is_nan()),
        _ => None,
    }
}

/// Numeric fields as seen in the first row only. Fields that first appear
/// in later rows are never reported.
pub fn numeric_field_names(dataset: &[Row]) -> Vec<String> {
    let Some(first) = dataset.first() else {
        return Vec::new();
    };

    first
        .fields
        .iter()
        .filter(|(_, value)| is_numeric(value))
        .map(|(name, _)| name.clone())
        .collect()
}
