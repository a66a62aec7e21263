//! Schema Normalizer
//!
//! Converts a raw engine response (`{schema, datarows}`) into a typed
//! DataFrame. Engine-reported type tags map many-to-few onto a small set
//! of canonical column types; tags with no clean semantic mapping
//! (objects, structs, dates, arrays, ips) keep their textual form as
//! strings.

use crate::error::{EvalError, Result};
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// Canonical semantic type an engine type tag normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Float64,
    String,
    NullableInt64,
    NullableInt32,
    Bool,
}

impl ColumnType {
    /// Map an engine-reported type tag to its canonical type.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let mapped = match tag {
            "float" | "double" => ColumnType::Float64,
            "keyword" | "text" | "object" | "timestamp" | "string" | "array" | "date"
            | "struct" | "ip" => ColumnType::String,
            "long" => ColumnType::NullableInt64,
            "integer" => ColumnType::NullableInt32,
            "boolean" => ColumnType::Bool,
            _ => return Err(EvalError::UnknownTypeTag(tag.to_string())),
        };
        Ok(mapped)
    }

    /// The polars dtype backing this canonical type.
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::Float64 => DataType::Float64,
            ColumnType::String => DataType::String,
            ColumnType::NullableInt64 => DataType::Int64,
            ColumnType::NullableInt32 => DataType::Int32,
            ColumnType::Bool => DataType::Boolean,
        }
    }
}

/// One `{name, type}` entry of an engine response schema.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// Raw tabular response as returned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub schema: Vec<SchemaColumn>,
    pub datarows: Vec<Vec<Value>>,
}

/// Context payload passed by the evaluation harness: the predicted
/// response under `receivedResponse`, the gold response under
/// `expectedResponse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalContext {
    pub received_response: RawResponse,
    pub expected_response: RawResponse,
}

/// Build a typed DataFrame from a raw response.
///
/// Column order follows the input schema order. Every row must have one
/// value per schema column, and every cell must coerce to its column's
/// canonical type; failures name the offending column and row.
pub fn normalize_response(resp: &RawResponse) -> Result<DataFrame> {
    for (row_idx, row) in resp.datarows.iter().enumerate() {
        if row.len() != resp.schema.len() {
            return Err(EvalError::ArityMismatch {
                row: row_idx,
                expected: resp.schema.len(),
                found: row.len(),
            });
        }
    }

    let mut columns = Vec::with_capacity(resp.schema.len());
    for (col_idx, field) in resp.schema.iter().enumerate() {
        let column_type = ColumnType::from_tag(&field.type_tag)?;
        columns.push(build_column(field, col_idx, column_type, &resp.datarows)?);
    }

    Ok(DataFrame::new(columns)?)
}

/// Build one typed Series from the positional values of a column.
fn build_column(
    field: &SchemaColumn,
    col_idx: usize,
    column_type: ColumnType,
    datarows: &[Vec<Value>],
) -> Result<Series> {
    let cells = datarows.iter().map(|row| &row[col_idx]);

    let series = match column_type {
        ColumnType::Float64 => {
            let mut values: Vec<Option<f64>> = Vec::with_capacity(datarows.len());
            for (row_idx, cell) in cells.enumerate() {
                values.push(coerce_float(cell).ok_or_else(|| bad_cell(field, row_idx, cell))?);
            }
            Series::new(&field.name, values)
        }
        ColumnType::NullableInt64 => {
            let mut values: Vec<Option<i64>> = Vec::with_capacity(datarows.len());
            for (row_idx, cell) in cells.enumerate() {
                values.push(coerce_int(cell).ok_or_else(|| bad_cell(field, row_idx, cell))?);
            }
            Series::new(&field.name, values)
        }
        ColumnType::NullableInt32 => {
            let mut values: Vec<Option<i32>> = Vec::with_capacity(datarows.len());
            for (row_idx, cell) in cells.enumerate() {
                let value = match coerce_int(cell) {
                    Some(None) => None,
                    Some(Some(v)) => Some(
                        i32::try_from(v).map_err(|_| bad_cell(field, row_idx, cell))?,
                    ),
                    None => return Err(bad_cell(field, row_idx, cell)),
                };
                values.push(value);
            }
            Series::new(&field.name, values)
        }
        ColumnType::String => {
            let mut values: Vec<Option<String>> = Vec::with_capacity(datarows.len());
            for (row_idx, cell) in cells.enumerate() {
                values.push(coerce_string(cell).ok_or_else(|| bad_cell(field, row_idx, cell))?);
            }
            Series::new(&field.name, values)
        }
        ColumnType::Bool => {
            let mut values: Vec<Option<bool>> = Vec::with_capacity(datarows.len());
            for (row_idx, cell) in cells.enumerate() {
                let value = match cell {
                    Value::Null => None,
                    Value::Bool(b) => Some(*b),
                    _ => return Err(bad_cell(field, row_idx, cell)),
                };
                values.push(value);
            }
            Series::new(&field.name, values)
        }
    };

    Ok(series)
}

fn bad_cell(field: &SchemaColumn, row_idx: usize, cell: &Value) -> EvalError {
    EvalError::Coercion {
        column: field.name.clone(),
        row: row_idx,
        value: cell.to_string(),
    }
}

/// `None` means the cell cannot represent a float; `Some(None)` is an
/// absent value.
fn coerce_float(cell: &Value) -> Option<Option<f64>> {
    match cell {
        Value::Null => Some(None),
        Value::Number(n) => n.as_f64().map(Some),
        Value::String(s) => s.trim().parse::<f64>().ok().map(Some),
        Value::Bool(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        _ => None,
    }
}

/// Integral numbers only; 2.5 does not coerce to an integer column.
fn coerce_int(cell: &Value) -> Option<Option<i64>> {
    match cell {
        Value::Null => Some(None),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Some(Some(v))
            } else {
                n.as_f64().and_then(|f| {
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        Some(Some(f as i64))
                    } else {
                        None
                    }
                })
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Some),
        Value::Bool(b) => Some(Some(i64::from(*b))),
        _ => None,
    }
}

/// Strings keep their text; numbers and booleans keep their JSON lexeme;
/// nested objects and arrays keep their compact JSON form.
fn coerce_string(cell: &Value) -> Option<Option<String>> {
    match cell {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Number(n) => Some(Some(n.to_string())),
        Value::Bool(b) => Some(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(cell).ok().map(Some),
    }
}

/// Render one cell as a hashable key component. An absent value stays
/// `None`, so a null never collides with a literal string.
pub fn render_value(series: &Series, row_idx: usize) -> Result<Option<String>> {
    let rendered = match series.dtype() {
        DataType::String => series.str()?.get(row_idx).map(|v| v.to_string()),
        DataType::Int64 => series.i64()?.get(row_idx).map(|v| v.to_string()),
        DataType::Int32 => series.i32()?.get(row_idx).map(|v| v.to_string()),
        DataType::Float64 => series
            .f64()?
            .get(row_idx)
            // -0.0 keys the same as 0.0
            .map(|v| (if v == 0.0 { 0.0 } else { v }).to_string()),
        DataType::Boolean => series.bool()?.get(row_idx).map(|v| v.to_string()),
        other => {
            return Err(EvalError::Internal(format!(
                "unexpected dtype {:?} in column '{}'",
                other,
                series.name()
            )))
        }
    };
    Ok(rendered)
}

/// Distinct values of a column, duplicates collapsed.
pub fn distinct_values(series: &Series) -> Result<HashSet<Option<String>>> {
    let mut values = HashSet::new();
    for row_idx in 0..series.len() {
        values.insert(render_value(series, row_idx)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(json: Value) -> RawResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_normalize_typed_columns() {
        let resp = response(json!({
            "schema": [
                {"name": "id", "type": "long"},
                {"name": "score", "type": "double"},
                {"name": "name", "type": "keyword"},
            ],
            "datarows": [[1, 1.5, "a"], [null, 2.0, null]],
        }));

        let df = normalize_response(&resp).unwrap();
        assert_eq!(df.get_column_names(), &["id", "score", "name"]);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("name").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("id").unwrap().i64().unwrap().get(1), None);
    }

    #[test]
    fn test_tag_mapping() {
        assert_eq!(ColumnType::from_tag("long").unwrap(), ColumnType::NullableInt64);
        assert_eq!(ColumnType::from_tag("integer").unwrap(), ColumnType::NullableInt32);
        assert_eq!(ColumnType::from_tag("double").unwrap(), ColumnType::Float64);
        assert_eq!(ColumnType::from_tag("boolean").unwrap(), ColumnType::Bool);
        for tag in ["keyword", "text", "object", "timestamp", "string", "array", "date", "struct", "ip"] {
            assert_eq!(ColumnType::from_tag(tag).unwrap(), ColumnType::String);
        }
        assert_eq!(ColumnType::from_tag("long").unwrap().dtype(), DataType::Int64);
        assert_eq!(ColumnType::from_tag("ip").unwrap().dtype(), DataType::String);
    }

    #[test]
    fn test_unknown_type_tag() {
        let resp = response(json!({
            "schema": [{"name": "x", "type": "geo_point"}],
            "datarows": [],
        }));

        match normalize_response(&resp) {
            Err(EvalError::UnknownTypeTag(tag)) => assert_eq!(tag, "geo_point"),
            other => panic!("expected UnknownTypeTag, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_arity_mismatch() {
        let resp = response(json!({
            "schema": [{"name": "x", "type": "long"}, {"name": "y", "type": "long"}],
            "datarows": [[1, 2], [3]],
        }));

        match normalize_response(&resp) {
            Err(EvalError::ArityMismatch { row, expected, found }) => {
                assert_eq!(row, 1);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected ArityMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_coercion_failure_names_column_and_row() {
        let resp = response(json!({
            "schema": [{"name": "count", "type": "long"}],
            "datarows": [[1], ["many"]],
        }));

        match normalize_response(&resp) {
            Err(EvalError::Coercion { column, row, .. }) => {
                assert_eq!(column, "count");
                assert_eq!(row, 1);
            }
            other => panic!("expected Coercion, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_struct_values_keep_textual_form() {
        let resp = response(json!({
            "schema": [{"name": "payload", "type": "struct"}],
            "datarows": [[{"a": 1}]],
        }));

        let df = normalize_response(&resp).unwrap();
        let rendered = df.column("payload").unwrap().str().unwrap().get(0);
        assert_eq!(rendered, Some("{\"a\":1}"));
    }
}
