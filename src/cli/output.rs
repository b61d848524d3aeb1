//! Rendering result relations for the terminal.

use csvql::{Relation, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::error::Result;
use crate::OutputFormat;

/// Render `relation` in the requested format.
pub fn format_relation(relation: &Relation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_as_table(relation)),
        OutputFormat::Csv => format_as_csv(relation),
        OutputFormat::Json => format_as_json(relation),
    }
}

fn format_as_table(relation: &Relation) -> String {
    let mut builder = Builder::new();
    builder.push_record(relation.column_names().iter().cloned());
    for row in relation.rows() {
        builder.push_record(row.iter().map(Value::to_string));
    }

    let mut table = builder.build();
    table.with(Style::rounded());

    let noun = if relation.len() == 1 { "row" } else { "rows" };
    format!("{table}\n({} {noun})", relation.len())
}

fn format_as_csv(relation: &Relation) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(relation.column_names())?;
    for row in relation.rows() {
        wtr.write_record(row.iter().map(Value::to_string))?;
    }
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn format_as_json(relation: &Relation) -> Result<String> {
    let rows: Vec<serde_json::Value> = relation
        .rows()
        .iter()
        .map(|row| {
            let obj: serde_json::Map<String, serde_json::Value> = relation
                .column_names()
                .iter()
                .zip(row)
                .map(|(col, val)| (col.clone(), value_to_json(val)))
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Convert a cell to JSON. Non-finite reals have no JSON form and become null.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Relation {
        Relation::from_rows(
            &["name", "score"],
            vec![
                vec![Value::from("Citra"), Value::Integer(90)],
                vec![Value::from("Ana, Jr"), Value::Null],
            ],
        )
    }

    #[test]
    fn table_has_header_and_footer() {
        let out = format_relation(&sample(), OutputFormat::Table).unwrap();
        assert!(out.contains("name"));
        assert!(out.contains("Citra"));
        assert!(out.contains('╭'));
        assert!(out.ends_with("(2 rows)"));
    }

    #[test]
    fn empty_table_still_prints_header() {
        let rel = Relation::from_rows(&["a"], vec![]);
        let out = format_relation(&rel, OutputFormat::Table).unwrap();
        assert!(out.contains('a'));
        assert!(out.ends_with("(0 rows)"));
    }

    #[test]
    fn csv_quotes_embedded_delimiters() {
        let out = format_relation(&sample(), OutputFormat::Csv).unwrap();
        assert_eq!(out, "name,score\nCitra,90\n\"Ana, Jr\",\n");
    }

    #[test]
    fn json_keeps_types_and_nulls() {
        let out = format_relation(&sample(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["score"], serde_json::json!(90));
        assert_eq!(parsed[1]["score"], serde_json::Value::Null);
        assert_eq!(parsed[1]["name"], serde_json::json!("Ana, Jr"));
    }

    #[test]
    fn nan_is_json_null() {
        assert_eq!(value_to_json(&Value::Real(f64::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(&Value::Real(2.5)), serde_json::json!(2.5));
    }
}
