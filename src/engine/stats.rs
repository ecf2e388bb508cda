use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{classify::numeric_value, coerce::serialize_number};
use crate::row::Row;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    #[serde(serialize_with = "serialize_number")]
    pub avg: f64,
    #[serde(serialize_with = "serialize_number")]
    pub min: f64,
    #[serde(serialize_with = "serialize_number")]
    pub max: f64,
    #[serde(serialize_with = "serialize_number")]
    pub sum: f64,
}

pub type FieldStatsByName = IndexMap<String, FieldStats>;

/// Per-field sum/avg/min/max over the numeric occurrences of each field.
/// Fields with no numeric occurrence get no entry.
pub fn compute_stats(
    dataset: &[Row],
    field_names: &[String],
) -> FieldStatsByName {
    let mut stats = IndexMap::new();

    for field in field_names {
        let values = numeric_values(dataset, field);
        if let Some(field_stats) = summarize(&values) {
            stats.insert(field.clone(), field_stats);
        }
    }

    stats
}

pub fn numeric_values(
    rows: &[Row],
    field: &str,
) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(field).and_then(numeric_value))
        .collect()
}

/// Left-to-right total starting from zero.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, value| acc + value)
}

fn summarize(values: &[f64]) -> Option<FieldStats> {
    let (first, rest) = values.split_first()?;

    let sum = sum(values);
    let (min, max) = rest
        .iter()
        .fold((*first, *first), |(min, max), value| (min.min(*value), max.max(*value)));

    Some(FieldStats {
        avg: sum / values.len() as f64,
        min,
        max,
        sum,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::row::Row;

    use super::compute_stats;

    #[test]
    fn computes_sum_avg_min_max() {
        let dataset = rows(json!([
            {"region": "West", "sales": 100},
            {"region": "East", "sales": 200},
            {"region": "West", "sales": 50}
        ]));

        let stats = compute_stats(&dataset, &["sales".to_string()]);
        let sales = stats.get("sales").expect("sales stats must exist");

        assert_eq!(sales.sum, 350.0);
        assert_eq!(sales.min, 50.0);
        assert_eq!(sales.max, 200.0);
        assert!((sales.avg - 116.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn skips_non_numeric_occurrences() {
        let dataset = rows(json!([
            {"amount": 10},
            {"amount": "n/a"},
            {"amount": null},
            {},
            {"amount": 30.5}
        ]));

        let stats = compute_stats(&dataset, &["amount".to_string()]);
        let amount = stats.get("amount").expect("amount stats must exist");

        assert_eq!(amount.sum, 40.5);
        assert_eq!(amount.avg, 20.25);
        assert_eq!(amount.min, 10.0);
        assert_eq!(amount.max, 30.5);
    }

    #[test]
    fn field_without_numeric_values_has_no_entry() {
        let dataset = rows(json!([{"label": "a"}, {"label": "b"}]));
        let stats = compute_stats(&dataset, &["label".to_string(), "missing".to_string()]);
        assert!(stats.is_empty());
    }

    #[test]
    fn entries_follow_requested_field_order() {
        let dataset = rows(json!([{"b": 1, "a": 2}]));
        let stats = compute_stats(&dataset, &["b".to_string(), "a".to_string()]);
        let names: Vec<_> = stats.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn serializes_integral_values_without_fraction() {
        let dataset = rows(json!([{"n": 1}, {"n": 2}]));
        let stats = compute_stats(&dataset, &["n".to_string()]);
        let text = serde_json::to_string(&stats).expect("stats must serialize");
        assert_eq!(text, r#"{"n":{"avg":1.5,"min":1,"max":2,"sum":3}}"#);
    }

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).expect("rows must parse")
    }
}
