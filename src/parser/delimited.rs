use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use serde_json::{Map, Number, Value};

use crate::{
    engine::coerce::{is_safe_integer, to_display_string},
    error::ParseError,
    row::Row,
};

// Numbers at or beyond 2^53 in magnitude stay text.
const MAX_TYPED_MAGNITUDE: f64 = 9_007_199_254_740_992.0;

/// Reads a header-first CSV document into rows, typing each cell.
pub fn parse_csv(text: &str) -> Result<Vec<Row>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| ParseError::Csv(error.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|error| ParseError::Csv(error.to_string()))?;
        check_field_count(&headers, &record, index)?;

        let fields: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.to_string(), type_cell(cell)))
            .collect();
        rows.push(Row::new(fields));
    }

    Ok(rows)
}

fn check_field_count(
    headers: &StringRecord,
    record: &StringRecord,
    index: usize,
) -> Result<(), ParseError> {
    let expected = headers.len();
    let parsed = record.len();
    let kind = if parsed < expected {
        "Too few fields"
    } else if parsed > expected {
        "Too many fields"
    } else {
        return Ok(());
    };

    Err(ParseError::Csv(format!(
        "{kind}: expected {expected} fields but parsed {parsed} (row {})",
        index + 1
    )))
}

pub fn type_cell(cell: &str) -> Value {
    match cell {
        "" => Value::Null,
        "true" | "TRUE" => Value::Bool(true),
        "false" | "FALSE" => Value::Bool(false),
        _ => typed_number(cell).unwrap_or_else(|| Value::String(cell.to_string())),
    }
}

fn typed_number(cell: &str) -> Option<Value> {
    if !looks_like_float(cell) {
        return None;
    }

    let value: f64 = cell.trim().parse().ok()?;
    if value.abs() >= MAX_TYPED_MAGNITUDE {
        return None;
    }

    if is_safe_integer(value) {
        Some(Value::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number)
    }
}

/// `-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?` with surrounding whitespace.
fn looks_like_float(cell: &str) -> bool {
    let body = cell.trim();
    let body = body.strip_prefix('-').unwrap_or(body);

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(index) => (&body[..index], Some(&body[index + 1..])),
        None => (body, None),
    };

    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, fraction)) => {
            all_digits(whole) && all_digits(fraction) && !(whole.is_empty() && fraction.is_empty())
        }
        None => !mantissa.is_empty() && all_digits(mantissa),
    };

    let exponent_ok = exponent.is_none_or(|exponent| {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        !digits.is_empty() && all_digits(digits)
    });

    mantissa_ok && exponent_ok
}

fn all_digits(text: &str) -> bool {
    text.bytes().all(|byte| byte.is_ascii_digit())
}

/// Header from the first row's fields; CRLF between records and no
/// trailing line break.
pub fn to_csv(rows: &[Row]) -> Result<String, ParseError> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let columns: Vec<&str> = first.field_names().collect();

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer
        .write_record(&columns)
        .map_err(|error| ParseError::CsvWrite(error.to_string()))?;

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match row.get(column) {
                None | Some(Value::Null) => String::new(),
                Some(value) => to_display_string(value),
            })
            .collect();
        writer
            .write_record(&cells)
            .map_err(|error| ParseError::CsvWrite(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| ParseError::CsvWrite(error.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|error| ParseError::CsvWrite(error.to_string()))?;

    Ok(text.strip_suffix("\r\n").unwrap_or(&text).to_string())
}
