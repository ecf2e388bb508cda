pub mod delimited;

use serde::Serialize;
use serde_json::Value;

use crate::{error::ParseError, row::Row};

pub use delimited::{parse_csv, to_csv};

const CSV_MIMES: [&str; 2] = ["text/csv", "application/vnd.ms-excel"];
const JSON_MIME: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    /// CSV wins when both the mime type and the extension could apply.
    pub fn detect(
        filename: &str,
        mime: Option<&str>,
    ) -> Result<Self, ParseError> {
        let lower = filename.to_lowercase();
        let mime = mime.map(str::to_lowercase);
        let mime = mime.as_deref();

        if mime.is_some_and(|mime| CSV_MIMES.contains(&mime)) || lower.ends_with(".csv") {
            return Ok(Self::Csv);
        }
        if mime == Some(JSON_MIME) || lower.ends_with(".json") {
            return Ok(Self::Json);
        }

        Err(ParseError::UnsupportedFormat)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedUpload {
    pub data: Vec<Row>,
    pub filename: String,
    pub format: SourceFormat,
}

pub fn parse_upload(
    filename: &str,
    mime: Option<&str>,
    bytes: &[u8],
) -> Result<ParsedUpload, ParseError> {
    let format = SourceFormat::detect(filename, mime)?;
    let text = std::str::from_utf8(bytes)?;

    let data = match format {
        SourceFormat::Csv => parse_csv(text)?,
        SourceFormat::Json => parse_json(text)?,
    };

    if data.is_empty() {
        return Err(ParseError::EmptyData);
    }

    Ok(ParsedUpload {
        data,
        filename: filename.to_string(),
        format,
    })
}

/// Accepts a top-level array, an object carrying a `data` array, or a single
/// object.
pub fn parse_json(text: &str) -> Result<Vec<Row>, ParseError> {
    let parsed: Value = serde_json::from_str(text)?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_array) => {
            match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    };

    if items.is_empty() {
        return Err(ParseError::EmptyData);
    }

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => Ok(Row::new(fields)),
            _ => Err(ParseError::NotObjects),
        })
        .collect()
}
