use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of an uploaded dataset. Field order is the order the fields
/// appeared in the source document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub fields: Map<String, Value>,
}

pub type Dataset = Vec<Row>;

impl Row {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::Row;

    #[test]
    fn get_reads_present_field() {
        let row: Row = serde_json::from_value(json!({"region": "West"})).expect("row must parse");
        assert_eq!(row.get("region"), Some(&Value::String("West".to_string())));
        assert_eq!(row.get("sales"), None);
    }

    #[test]
    fn field_names_keep_source_order() {
        let row: Row = serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#)
            .expect("row must parse");
        let names: Vec<_> = row.field_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let row: Row = serde_json::from_value(json!({"id": 1})).expect("row must parse");
        let text = serde_json::to_string(&row).expect("row must serialize");
        assert_eq!(text, r#"{"id":1}"#);
    }
}
