use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::{
    engine::{
        GroupSums,
        coerce::{format_f64, is_safe_integer},
    },
    error::OutputError,
    service::StatusReport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

pub fn print_status(
    report: &StatusReport,
    format: OutputFormat,
) -> Result<(), OutputError> {
    println!("{}", render_status(report, format)?);
    Ok(())
}

pub fn print_group_sums(
    field: &str,
    sums: &GroupSums,
    format: OutputFormat,
) -> Result<(), OutputError> {
    println!("{}", render_group_sums(field, sums, format)?);
    Ok(())
}

pub fn render_status(
    report: &StatusReport,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Table => Ok(render_status_table(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Yaml => render_yaml(report),
    }
}

pub fn render_group_sums(
    field: &str,
    sums: &GroupSums,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Table => Ok(render_group_sums_table(field, sums)),
        OutputFormat::Json => render_json(&group_sums_value(sums)),
        OutputFormat::Yaml => render_yaml(&group_sums_value(sums)),
    }
}

fn render_json<T: Serialize>(value: &T) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn render_yaml<T: Serialize>(value: &T) -> Result<String, OutputError> {
    Ok(serde_yaml::to_string(value)?)
}

fn group_sums_value(sums: &GroupSums) -> Value {
    let map: Map<String, Value> = sums
        .iter()
        .map(|(key, sum)| (key.clone(), number_value(*sum)))
        .collect();
    Value::Object(map)
}

fn number_value(value: f64) -> Value {
    if is_safe_integer(value) {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

pub fn render_status_table(report: &StatusReport) -> String {
    let summary = &report.result.summary;
    let mut lines = Vec::new();

    let source = if report.cached { "cached" } else { "computed" };
    match &report.filename {
        Some(filename) => lines.push(format!("file: {filename} ({source})")),
        None => lines.push(format!("result: {source}")),
    }
    lines.push(format!("rows: {}", summary.total_rows));

    if !summary.numeric_fields.is_empty() {
        let header = ["field", "sum", "avg", "min", "max"].map(str::to_string).to_vec();
        let body: Vec<Vec<String>> = summary
            .numeric_fields
            .iter()
            .map(|(name, stats)| {
                vec![
                    name.clone(),
                    rounded(stats.sum),
                    rounded(stats.avg),
                    rounded(stats.min),
                    rounded(stats.max),
                ]
            })
            .collect();
        lines.push(String::new());
        lines.extend(render_grid(&header, &body));
    }

    let header = vec!["group".to_string(), "rows".to_string()];
    let body: Vec<Vec<String>> = report
        .result
        .grouped_data
        .iter()
        .map(|(key, rows)| vec![key.clone(), rows.len().to_string()])
        .collect();
    if !body.is_empty() {
        lines.push(String::new());
        lines.extend(render_grid(&header, &body));
    }
    lines.push(format!("groups: {}", body.len()));

    lines.join("\n")
}

pub fn render_group_sums_table(
    field: &str,
    sums: &GroupSums,
) -> String {
    if sums.is_empty() {
        return format!("no numeric values for '{field}'");
    }

    let header = vec!["group".to_string(), format!("sum({field})")];
    let body: Vec<Vec<String>> = sums
        .iter()
        .map(|(key, sum)| vec![key.clone(), rounded(*sum)])
        .collect();

    let mut lines = render_grid(&header, &body);
    lines.push(format!("groups: {}", sums.len()));
    lines.join("\n")
}

fn rounded(value: f64) -> String {
    format_f64((value * 100.0).round() / 100.0)
}

fn render_grid(
    header: &[String],
    body: &[Vec<String>],
) -> Vec<String> {
    let widths = compute_widths(header, body);
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(header, &widths));
    lines.push(format_separator(&widths));
    for row in body {
        lines.push(format_row(row, &widths));
    }
    lines
}

fn compute_widths(
    header: &[String],
    body: &[Vec<String>],
) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(index, column)| {
            body.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .fold(column.chars().count(), usize::max)
        })
        .collect()
}

fn format_row(
    cells: &[String],
    widths: &[usize],
) -> String {
    let mut out = String::new();
    out.push('|');
    for (index, cell) in cells.iter().enumerate() {
        out.push(' ');
        out.push_str(cell);
        let padding = widths[index].saturating_sub(cell.chars().count());
        out.push_str(&" ".repeat(padding));
        out.push(' ');
        out.push('|');
    }
    out
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    out.push('|');
    for width in widths {
        out.push(' ');
        out.push_str(&"-".repeat(*width));
        out.push(' ');
        out.push('|');
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{
        engine::{GroupSums, aggregate},
        row::Row,
        service::StatusReport,
    };

    use super::{OutputFormat, render_group_sums, render_status};

    fn report() -> StatusReport {
        let rows: Vec<Row> = serde_json::from_value(json!([
            {"region": "West", "sales": 100},
            {"region": "East", "sales": 200},
            {"region": "West", "sales": 50}
        ]))
        .expect("rows must parse");

        StatusReport {
            success: true,
            cached: false,
            filename: Some("sales.csv".to_string()),
            uploaded_at: Some("2026-01-01T00:00:00.000Z".to_string()),
            result: aggregate(&rows),
        }
    }

    #[test]
    fn renders_table_with_stats_and_groups() {
        let out = render_status(&report(), OutputFormat::Table).expect("table must render");

        assert!(out.contains("file: sales.csv (computed)"));
        assert!(out.contains("rows: 3"));
        assert!(out.contains("| sales | 350 | 116.67 | 50  | 200 |"));
        assert!(out.contains("| West  | 2    |"));
        assert!(out.contains("groups: 2"));
    }

    #[test]
    fn renders_json_with_wire_keys() {
        let out = render_status(&report(), OutputFormat::Json).expect("json must render");
        let value: Value = serde_json::from_str(&out).expect("output must be json");
        assert_eq!(value["summary"]["totalRows"], json!(3));
        assert_eq!(value["filename"], json!("sales.csv"));
        assert_eq!(value["originalData"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn renders_yaml() {
        let out = render_status(&report(), OutputFormat::Yaml).expect("yaml must render");
        assert!(out.contains("totalRows: 3"));
        assert!(out.contains("groupedData:"));
    }

    #[test]
    fn renders_group_sums() {
        let mut sums = GroupSums::new();
        sums.insert("West".to_string(), 150.0);
        sums.insert("East".to_string(), 0.25);

        let table = render_group_sums("sales", &sums, OutputFormat::Table).expect("table");
        assert!(table.contains("| group | sum(sales) |"));
        assert!(table.contains("| West  | 150        |"));

        let json = render_group_sums("sales", &sums, OutputFormat::Json).expect("json");
        let value: Value = serde_json::from_str(&json).expect("output must be json");
        assert_eq!(value, json!({"West": 150, "East": 0.25}));
    }

    #[test]
    fn empty_group_sums_render_a_note() {
        let out = render_group_sums("sales", &GroupSums::new(), OutputFormat::Table).expect("table");
        assert_eq!(out, "no numeric values for 'sales'");
    }
}
