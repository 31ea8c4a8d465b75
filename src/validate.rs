//! Data quality validation.
//!
//! Rules are evaluated independently against the original table; outcomes
//! are explicit result values, never annotations on the caller's rule
//! descriptors. Unknown rule types are skipped (neither passed nor failed)
//! but still count toward `total_rules`.

use crate::error::PipelineError;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single validation rule descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    NotNull {
        column: String,
    },
    Unique {
        column: String,
    },
    Range {
        column: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    #[serde(other)]
    Unknown,
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: ValidationRule,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregate report over all evaluated rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub passed: Vec<RuleOutcome>,
    pub failed: Vec<RuleOutcome>,
    pub total_rules: usize,
    /// Fraction of rules that passed, in [0, 1]; 0 for an empty rule list.
    pub pass_rate: f64,
}

/// Evaluate rules against a table and produce a report.
pub fn validate(table: &Table, rules: &[ValidationRule]) -> Result<QualityReport, PipelineError> {
    let mut passed = Vec::new();
    let mut failed = Vec::new();

    for rule in rules {
        let violations = match rule {
            ValidationRule::NotNull { column } => {
                let count = count_nulls(table, column)?;
                (count, format!("{count} null values found"))
            }
            ValidationRule::Unique { column } => {
                let count = count_duplicates(table, column)?;
                (count, format!("{count} duplicates found"))
            }
            ValidationRule::Range { column, min, max } => {
                let count = count_out_of_range(table, column, *min, *max)?;
                (count, format!("{count} values out of range"))
            }
            ValidationRule::Unknown => continue,
        };
        match violations {
            (0, _) => passed.push(RuleOutcome {
                rule: rule.clone(),
                passed: true,
                message: None,
            }),
            (_, message) => failed.push(RuleOutcome {
                rule: rule.clone(),
                passed: false,
                message: Some(message),
            }),
        }
    }

    let total_rules = rules.len();
    let pass_rate = if total_rules > 0 {
        passed.len() as f64 / total_rules as f64
    } else {
        0.0
    };
    tracing::info!(
        passed = passed.len(),
        total = total_rules,
        "Data quality validation complete"
    );
    Ok(QualityReport {
        passed,
        failed,
        total_rules,
        pass_rate,
    })
}

fn column_of<'a>(
    table: &'a Table,
    column: &str,
) -> Result<impl Iterator<Item = &'a serde_json::Value>, PipelineError> {
    let index = table
        .column_index(column)
        .ok_or_else(|| PipelineError::column_not_found(column))?;
    Ok(table.column_values(index))
}

fn count_nulls(table: &Table, column: &str) -> Result<usize, PipelineError> {
    Ok(column_of(table, column)?.filter(|v| v.is_null()).count())
}

/// Entries beyond the first occurrence of each repeated value.
fn count_duplicates(table: &Table, column: &str) -> Result<usize, PipelineError> {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for value in column_of(table, column)? {
        let key = serde_json::to_string(value)?;
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

/// Rows whose numeric value falls below `min` or above `max`; inclusive
/// bounds pass. Null and non-numeric cells are never violations.
fn count_out_of_range(
    table: &Table,
    column: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<usize, PipelineError> {
    Ok(column_of(table, column)?
        .filter_map(|v| v.as_f64())
        .filter(|&x| min.is_some_and(|m| x < m) || max.is_some_and(|m| x > m))
        .count())
}
