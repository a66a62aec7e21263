//! Row-Set Equivalence Checker
//!
//! Decides whether two tables with aligned columns contain the same rows
//! up to ordering: a full outer join over every column, where any row
//! key landing on only one side — or with different multiplicity on the
//! two sides — breaks equivalence.

use crate::align::{align_columns, ColumnMapping};
use crate::error::Result;
use crate::schema::{normalize_response, render_value, EvalContext};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Compare a predicted and a gold result for semantic equivalence.
///
/// Data from two queries can be the same but with permuted rows,
/// permuted columns, or identical columns under different names. Columns
/// are aligned first (by name, or by type/value-set evidence when the
/// name sets differ), then row multisets are compared. Deterministic for
/// a fixed pair of inputs.
pub fn execution_accuracy(pred: &DataFrame, gold: &DataFrame) -> Result<bool> {
    let mapping = match align_columns(gold, pred)? {
        Some(mapping) => mapping,
        None => return Ok(false),
    };
    rows_equivalent(gold, pred, &mapping)
}

/// Check row-multiset equality of two tables under a column mapping.
///
/// Every gold column is cast to its predicted counterpart's type — a
/// failed cast is a definitive negative verdict, not a fault — and float
/// columns on both sides are rounded to 4 decimals before the join keys
/// are formed.
pub fn rows_equivalent(gold: &DataFrame, pred: &DataFrame, mapping: &ColumnMapping) -> Result<bool> {
    // Rename gold columns to their predicted images so both tables share
    // one column set.
    let mut gold_aligned = gold.clone();
    for (gold_name, pred_name) in mapping.pairs() {
        if gold_name != pred_name {
            gold_aligned.rename(gold_name, pred_name)?;
        }
    }

    let mut gold_columns = Vec::with_capacity(pred.width());
    let mut pred_columns = Vec::with_capacity(pred.width());

    for pred_series in pred.get_columns() {
        let dtype = pred_series.dtype();
        let gold_series = gold_aligned.column(pred_series.name())?;

        let casted = match gold_series.strict_cast(dtype) {
            Ok(series) => series,
            Err(err) => {
                debug!(
                    "Gold column '{}' does not cast to {:?}: {}",
                    pred_series.name(),
                    dtype,
                    err
                );
                return Ok(false);
            }
        };

        if *dtype == DataType::Float64 {
            gold_columns.push(casted.round(4)?);
            pred_columns.push(pred_series.round(4)?);
        } else {
            gold_columns.push(casted);
            pred_columns.push(pred_series.clone());
        }
    }

    let gold_counts = row_counts(&DataFrame::new(gold_columns)?)?;
    let pred_counts = row_counts(&DataFrame::new(pred_columns)?)?;

    if gold_counts != pred_counts {
        debug!("Row multisets differ between gold and predicted tables");
        return Ok(false);
    }

    Ok(true)
}

/// Occurrence count per row key, all columns participating in the key.
fn row_counts(df: &DataFrame) -> Result<HashMap<Vec<Option<String>>, usize>> {
    let columns = df.get_columns();
    let mut counts: HashMap<Vec<Option<String>>, usize> = HashMap::new();

    for row_idx in 0..df.height() {
        let mut key = Vec::with_capacity(columns.len());
        for series in columns {
            key.push(render_value(series, row_idx)?);
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    Ok(counts)
}

/// Evaluate a serialized harness context: parse, normalize both
/// responses and compare. The verdict is the payload; a negative verdict
/// is a successful computation.
pub fn evaluate_context(context: &str) -> Result<bool> {
    let context: EvalContext = serde_json::from_str(context)?;
    let pred = normalize_response(&context.received_response)?;
    let gold = normalize_response(&context.expected_response)?;
    execution_accuracy(&pred, &gold)
}
