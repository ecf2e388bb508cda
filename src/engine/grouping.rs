use indexmap::IndexMap;

use super::coerce::{is_falsy, to_display_string};
use crate::row::Row;

pub const UNKNOWN_GROUP: &str = "Unknown";

/// Group key to member rows, in first-occurrence order of keys.
pub type GroupedRows = IndexMap<String, Vec<Row>>;

pub fn group_by(
    dataset: &[Row],
    field: Option<&str>,
) -> GroupedRows {
    let mut grouped = GroupedRows::new();
    let Some(field) = field else {
        return grouped;
    };

    for row in dataset {
        grouped
            .entry(group_key(row, field))
            .or_default()
            .push(row.clone());
    }

    grouped
}

pub fn group_key(
    row: &Row,
    field: &str,
) -> String {
    match row.get(field) {
        Some(value) if !is_falsy(Some(value)) => to_display_string(value),
        _ => UNKNOWN_GROUP.to_string(),
    }
}
