//! Column Aligner
//!
//! Recovers a 1:1 correspondence between gold and predicted columns when
//! their name sets differ. Column names are often cosmetic aliases, so
//! identity is recovered by content: a gold column matches a predicted
//! column when it casts to the predicted type and the distinct value
//! sets agree.

use crate::error::Result;
use crate::schema::distinct_values;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// A resolved gold-to-predicted column correspondence.
///
/// Covers every gold column exactly once and leaves no predicted column
/// over; built and consumed within a single comparison.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    /// `(gold_name, pred_name)` pairs in gold declared order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Find a mapping renaming gold columns onto predicted columns.
///
/// Returns `Ok(None)` when no 1:1 mapping exists — a legitimate negative
/// verdict, not an error. The scan is deliberately greedy: gold columns
/// in gold declared order, candidates in predicted declared order, first
/// candidate whose cast succeeds and whose value set matches wins.
pub fn align_columns(gold: &DataFrame, pred: &DataFrame) -> Result<Option<ColumnMapping>> {
    let gold_names: Vec<String> = gold.get_column_names().iter().map(|s| s.to_string()).collect();
    let pred_names: Vec<String> = pred.get_column_names().iter().map(|s| s.to_string()).collect();

    let gold_set: HashSet<String> = gold_names.iter().cloned().collect();
    let pred_set: HashSet<String> = pred_names.iter().cloned().collect();

    // Best case: the name sets agree and columns are already matched.
    // No casting or rounding happens here; the row checker works from
    // the original per-column types.
    if gold_set == pred_set {
        let pairs = gold_names.iter().map(|n| (n.clone(), n.clone())).collect();
        return Ok(Some(ColumnMapping { pairs }));
    }

    // Columns sharing a name on both sides are kept as matched; the
    // remainder of each side enters the greedy scan.
    let mut pairs: Vec<(String, String)> = gold_names
        .iter()
        .filter(|n| pred_set.contains(n.as_str()))
        .map(|n| (n.clone(), n.clone()))
        .collect();

    let unmatched_gold: Vec<String> = gold_names
        .iter()
        .filter(|n| !pred_set.contains(n.as_str()))
        .cloned()
        .collect();
    let mut candidates: Vec<String> = pred_names
        .iter()
        .filter(|n| !gold_set.contains(n.as_str()))
        .cloned()
        .collect();

    for gold_col in unmatched_gold {
        let mut matched = None;

        for (pos, pred_col) in candidates.iter().enumerate() {
            let pred_series = pred.column(pred_col)?;
            let pred_dtype = pred_series.dtype().clone();

            // Casting evidence works on private copies; the frames the
            // row checker sees keep their original values.
            let casted = match gold.column(&gold_col)?.strict_cast(&pred_dtype) {
                Ok(series) => series,
                Err(_) => continue,
            };

            let (gold_values, pred_values) = if pred_dtype == DataType::Float64 {
                (
                    distinct_values(&casted.round(4)?)?,
                    distinct_values(&pred_series.round(4)?)?,
                )
            } else {
                (distinct_values(&casted)?, distinct_values(pred_series)?)
            };

            if gold_values == pred_values {
                matched = Some(pos);
                break;
            }
        }

        match matched {
            Some(pos) => {
                let pred_col = candidates.remove(pos);
                debug!("Aligned gold column '{}' to predicted column '{}'", gold_col, pred_col);
                pairs.push((gold_col, pred_col));
            }
            None => {
                debug!("No predicted column matches gold column '{}'", gold_col);
                return Ok(None);
            }
        }
    }

    if !candidates.is_empty() {
        debug!("Predicted columns left unmatched: {:?}", candidates);
        return Ok(None);
    }

    Ok(Some(ColumnMapping { pairs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping_for_equal_name_sets() {
        let gold = df!["id" => [1i64, 2], "name" => ["a", "b"]].unwrap();
        let pred = df!["name" => ["b", "a"], "id" => [2i64, 1]].unwrap();

        let mapping = align_columns(&gold, &pred).unwrap().unwrap();
        assert_eq!(
            mapping.pairs(),
            &[
                ("id".to_string(), "id".to_string()),
                ("name".to_string(), "name".to_string()),
            ]
        );
    }

    #[test]
    fn test_aligns_renamed_columns_by_value_set() {
        let gold = df!["id" => [1i64, 2], "name" => ["a", "b"]].unwrap();
        let pred = df!["uid" => [1i64, 2], "label" => ["a", "b"]].unwrap();

        let mapping = align_columns(&gold, &pred).unwrap().unwrap();
        assert_eq!(
            mapping.pairs(),
            &[
                ("id".to_string(), "uid".to_string()),
                ("name".to_string(), "label".to_string()),
            ]
        );
    }

    #[test]
    fn test_uncastable_candidate_is_skipped() {
        // "x"/"y" cannot cast to the Int64 candidate, and no other
        // candidate exists.
        let gold = df!["tag" => ["x", "y"]].unwrap();
        let pred = df!["count" => [1i64, 2]].unwrap();

        assert!(align_columns(&gold, &pred).unwrap().is_none());
    }

    #[test]
    fn test_leftover_predicted_column_fails() {
        let gold = df!["id" => [1i64, 2]].unwrap();
        let pred = df!["uid" => [1i64, 2], "extra" => ["a", "b"]].unwrap();

        assert!(align_columns(&gold, &pred).unwrap().is_none());
    }

    #[test]
    fn test_greedy_first_candidate_wins() {
        // Both predicted columns carry the same value set; the first in
        // predicted declared order is claimed.
        let gold = df!["v" => [1i64, 2]].unwrap();
        let pred = df!["b" => [1i64, 2], "a" => [1i64, 2]].unwrap();

        let mapping = align_columns(&gold, &pred).unwrap();
        // "a" stays unclaimed, so the mapping fails as a whole.
        assert!(mapping.is_none());

        let pred = df!["b" => [1i64, 2]].unwrap();
        let mapping = align_columns(&gold, &pred).unwrap().unwrap();
        assert_eq!(mapping.pairs(), &[("v".to_string(), "b".to_string())]);
    }
}
