use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported file format. Please upload CSV or JSON file.")]
    UnsupportedFormat,
    #[error("file is {size} bytes, larger than the {limit} byte upload limit")]
    TooLarge { size: usize, limit: usize },
    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("CSV parsing error: {0}")]
    Csv(String),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Data must be a non-empty array")]
    EmptyData,
    #[error("Data must be an array of objects")]
    NotObjects,
    #[error("failed to write CSV export: {0}")]
    CsvWrite(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode entry '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("failed to decode entry '{key}': {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid ID parameter")]
    InvalidId,
    #[error("Invalid format '{0}'. Use csv or json.")]
    InvalidExportFormat(String),
    #[error("Data not found. It may have expired or the ID is invalid.")]
    NotFound { id: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize json output: {0}")]
    JsonSerialize(#[from] serde_json::Error),
    #[error("failed to serialize yaml output: {0}")]
    YamlSerialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid args: {0}\n\nTip: run `datalens --help` to see usage and examples.")]
    InvalidArgs(String),
    #[error("failed to read '{path}': {source}\n\nTip: check that the file exists and is readable.")]
    ReadInput {
        path: String,
        source: std::io::Error,
    },
    #[error("{0}\n\n{tip}", tip = service_tip(.0))]
    Service(#[from] ServiceError),
    #[error(
        "output error: {0}\n\nTip: supported formats are `table`, `json`, `yaml`."
    )]
    Output(#[from] OutputError),
    #[error("failed to init async runtime: {0}")]
    RuntimeInit(std::io::Error),
}

fn service_tip(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::Parse(ParseError::UnsupportedFormat) => {
            "Tip: use a `.csv` or `.json` file, or pass `--mime text/csv` / `--mime application/json`."
        }
        ServiceError::Parse(ParseError::TooLarge { .. }) => {
            "Tip: raise the limit with `--max-upload-bytes` or DATALENS_MAX_UPLOAD_BYTES."
        }
        ServiceError::Parse(ParseError::EmptyData | ParseError::NotObjects) => {
            "Tip: input must be a non-empty array of objects, e.g. `[{\"region\": \"West\", \"sales\": 100}]`."
        }
        ServiceError::Parse(ParseError::Csv(_)) => {
            "Tip: every CSV record needs as many fields as the header row."
        }
        ServiceError::InvalidExportFormat(_) => "Tip: export formats are `csv` and `json`.",
        _ => "Tip: rerun with `--log-level debug` for more detail.",
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, ParseError, ServiceError};

    #[test]
    fn unsupported_format_contains_mime_tip() {
        let err = CliError::Service(ServiceError::Parse(ParseError::UnsupportedFormat));
        let rendered = err.to_string();
        assert!(rendered.contains("Unsupported file format"));
        assert!(rendered.contains("--mime text/csv"));
    }

    #[test]
    fn empty_data_contains_shape_tip() {
        let err = CliError::Service(ServiceError::Parse(ParseError::EmptyData));
        let rendered = err.to_string();
        assert!(rendered.contains("Data must be a non-empty array"));
        assert!(rendered.contains("non-empty array of objects"));
    }

    #[test]
    fn invalid_export_format_names_the_rejected_value() {
        let err = CliError::Service(ServiceError::InvalidExportFormat("xml".to_string()));
        let rendered = err.to_string();
        assert!(rendered.contains("Invalid format 'xml'. Use csv or json."));
        assert!(rendered.contains("export formats are `csv` and `json`"));
    }

    #[test]
    fn not_found_keeps_expiry_hint() {
        let err = ServiceError::NotFound {
            id: "abc".to_string(),
        };
        assert!(err.to_string().contains("may have expired"));
    }
}
