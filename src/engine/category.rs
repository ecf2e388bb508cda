use std::collections::HashSet;

use log::debug;
use serde_json::Value;

use crate::row::Row;

/// Field-name tokens that mark a field as a grouping key, in priority order.
pub const PREFERRED_NAMES: [&str; 6] = ["category", "type", "group", "status", "region", "product"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionRule {
    PreferredName(&'static str),
    Cardinality { distinct: usize },
    FirstField,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySelection {
    pub field: String,
    pub rule: SelectionRule,
}

type SelectionCheck = fn(&[Row], &[&str]) -> Option<CategorySelection>;

/// Checks run in order; the first match wins.
const SELECTION_CHECKS: [(&str, SelectionCheck); 3] = [
    ("preferred-name", preferred_name_match),
    ("moderate-cardinality", moderate_cardinality_match),
    ("first-field", first_field_match),
];

pub fn select_categorical_field(dataset: &[Row]) -> Option<String> {
    select_category(dataset).map(|selection| selection.field)
}

pub fn select_category(dataset: &[Row]) -> Option<CategorySelection> {
    let first = dataset.first()?;
    let fields: Vec<&str> = first.field_names().collect();

    SELECTION_CHECKS.iter().find_map(|&(name, check)| {
        let selection = check(dataset, fields.as_slice())?;
        debug!("categorical field '{}' chosen by {name} check", selection.field);
        Some(selection)
    })
}

/// Scans tokens in priority order, and within a token the fields in order.
pub fn preferred_name_match(
    _dataset: &[Row],
    fields: &[&str],
) -> Option<CategorySelection> {
    PREFERRED_NAMES.iter().find_map(|&token| {
        fields
            .iter()
            .find(|field| field.to_lowercase().contains(token))
            .map(|field| CategorySelection {
                field: (*field).to_string(),
                rule: SelectionRule::PreferredName(token),
            })
    })
}

/// First field with more than one distinct value and fewer distinct values
/// than half the row count.
pub fn moderate_cardinality_match(
    dataset: &[Row],
    fields: &[&str],
) -> Option<CategorySelection> {
    let half = dataset.len() as f64 / 2.0;

    fields.iter().find_map(|field| {
        let distinct = distinct_count(dataset, field);
        (distinct > 1 && (distinct as f64) < half).then(|| CategorySelection {
            field: (*field).to_string(),
            rule: SelectionRule::Cardinality { distinct },
        })
    })
}

pub fn first_field_match(
    _dataset: &[Row],
    fields: &[&str],
) -> Option<CategorySelection> {
    fields.first().map(|field| CategorySelection {
        field: (*field).to_string(),
        rule: SelectionRule::FirstField,
    })
}

pub fn distinct_count(
    dataset: &[Row],
    field: &str,
) -> usize {
    dataset
        .iter()
        .enumerate()
        .map(|(index, row)| DistinctKey::new(row.get(field), index))
        .collect::<HashSet<_>>()
        .len()
}

// Missing and null are separate values; every nested value is unique.
#[derive(Debug, PartialEq, Eq, Hash)]
enum DistinctKey<'a> {
    Missing,
    Null,
    Bool(bool),
    Number(u64),
    String(&'a str),
    Nested(usize),
}

impl<'a> DistinctKey<'a> {
    fn new(
        value: Option<&'a Value>,
        row_index: usize,
    ) -> Self {
        match value {
            None => Self::Missing,
            Some(Value::Null) => Self::Null,
            Some(Value::Bool(flag)) => Self::Bool(*flag),
            Some(Value::String(text)) => Self::String(text),
            Some(Value::Number(number)) => {
                let value = number.as_f64().unwrap_or_default();
                let normalized = if value == 0.0 { 0.0 } else { value };
                Self::Number(normalized.to_bits())
            }
            Some(Value::Array(_)) | Some(Value::Object(_)) => Self::Nested(row_index),
        }
    }
}
