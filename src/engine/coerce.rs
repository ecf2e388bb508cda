use serde::Serializer;
use serde_json::{Number, Value};

// Largest magnitude at which every integer is exactly representable in f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const EXPONENT_LOWER_BOUND: f64 = 1e-6;
const EXPONENT_UPPER_BOUND: f64 = 1e21;

/// Missing, null, false, zero and the empty string collapse to nothing.
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => !flag,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Number(number)) => number.as_f64().is_none_or(|value| value == 0.0 || value.is_nan()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// Dynamic-language string form of a value: numbers without a trailing
/// `.0`, arrays comma-joined, objects as an opaque tag.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number_to_string(number),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn number_to_string(number: &Number) -> String {
    if let Some(value) = number.as_i64() {
        return value.to_string();
    }
    if let Some(value) = number.as_u64() {
        return value.to_string();
    }
    number.as_f64().map(format_f64).unwrap_or_else(|| number.to_string())
}

/// Shortest round-trip digits, switching to exponent form outside
/// `[1e-6, 1e21)` the way dynamic number-to-string does (`1e+21`, `1.5e-7`).
pub fn format_f64(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if !(EXPONENT_LOWER_BOUND..EXPONENT_UPPER_BOUND).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    format!("{value}")
}

/// Integral floats are emitted as JSON integers so `350.0` goes over the
/// wire as `350`.
pub fn serialize_number<S>(
    value: &f64,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if is_safe_integer(*value) {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

pub fn is_safe_integer(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER
}
