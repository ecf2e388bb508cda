pub mod category;
pub mod classify;
pub mod coerce;
pub mod grouping;
pub mod stats;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::row::{Dataset, Row};

pub use category::{CategorySelection, SelectionRule, select_categorical_field, select_category};
pub use classify::{is_numeric, numeric_field_names};
pub use grouping::{GroupedRows, UNKNOWN_GROUP, group_by};
pub use stats::{FieldStats, FieldStatsByName, compute_stats};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_rows: usize,
    pub numeric_fields: FieldStatsByName,
}

/// Summary of one dataset. Serializes to the `summary` / `groupedData` /
/// `originalData` wire shape the cache and dashboard read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub summary: Summary,
    #[serde(rename = "groupedData")]
    pub grouped_data: GroupedRows,
    #[serde(rename = "originalData")]
    pub original_data: Dataset,
}

impl AggregationResult {
    pub fn total_row_count(&self) -> usize {
        self.summary.total_rows
    }

    pub fn field_stats_by_name(&self) -> &FieldStatsByName {
        &self.summary.numeric_fields
    }
}

/// Group key to the sum of one numeric field across that group.
pub type GroupSums = IndexMap<String, f64>;

pub fn aggregate(dataset: &[Row]) -> AggregationResult {
    let numeric_fields = numeric_field_names(dataset);
    let field_stats = compute_stats(dataset, &numeric_fields);

    let categorical_field = select_categorical_field(dataset);
    let grouped_data = group_by(dataset, categorical_field.as_deref());

    debug!(
        "aggregated {} rows: {} numeric fields, {} groups",
        dataset.len(),
        field_stats.len(),
        grouped_data.len()
    );

    AggregationResult {
        summary: Summary {
            total_rows: dataset.len(),
            numeric_fields: field_stats,
        },
        grouped_data,
        original_data: dataset.to_vec(),
    }
}

/// Sums `field` per group. Groups without a numeric value for the field are
/// left out; rows missing the field contribute nothing.
pub fn aggregate_per_group(
    grouped: &GroupedRows,
    field: &str,
) -> GroupSums {
    grouped
        .iter()
        .filter_map(|(key, rows)| {
            let values = stats::numeric_values(rows, field);
            (!values.is_empty()).then(|| (key.clone(), stats::sum(&values)))
        })
        .collect()
}
