//! In-memory tabular dataset with named, equal-length columns.

use serde::{Deserialize, Serialize};

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    Null,
    Unknown,
}

/// A table of rows over named columns.
///
/// Storage is row-major: each row holds one [`serde_json::Value`] cell per
/// column. Nulls are `Value::Null`. Every row has the same length as
/// `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cell values of the column at `index`, top to bottom. `index`
    /// must come from [`Table::column_index`]; every row has one cell per
    /// column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &serde_json::Value> {
        self.rows.iter().map(move |row| &row[index])
    }
}

/// Infer column type from a sample of values.
pub fn infer_column_type(values: &[serde_json::Value]) -> ColumnType {
    let non_null: Vec<_> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_string = false;

    for v in &non_null {
        match v {
            serde_json::Value::Number(n) => {
                if n.is_f64() {
                    has_float = true;
                } else {
                    has_int = true;
                }
            }
            serde_json::Value::Bool(_) => has_bool = true,
            serde_json::Value::String(_) => has_string = true,
            _ => {}
        }
    }

    if has_string {
        let all_timestamps = non_null.iter().all(|v| {
            v.as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
        });
        return if all_timestamps {
            ColumnType::Timestamp
        } else {
            ColumnType::String
        };
    }
    if has_float {
        return ColumnType::Float;
    }
    if has_int {
        return ColumnType::Integer;
    }
    if has_bool {
        return ColumnType::Boolean;
    }
    ColumnType::Unknown
}

/// Parse a raw text cell into a typed value: integer, then float, then
/// boolean, then string. Empty cells become null.
pub(crate) fn parse_cell(s: &str) -> serde_json::Value {
    let s = s.trim();
    if s.is_empty() {
        return serde_json::Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return serde_json::Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        return serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(s.to_string()));
    }
    if s == "true" || s == "false" {
        return serde_json::Value::Bool(s == "true");
    }
    serde_json::Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = Table::empty();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_column_index() {
        let table = Table::new(
            vec!["id".into(), "value".into()],
            vec![vec![serde_json::json!(1), serde_json::json!(5)]],
        );
        assert_eq!(table.column_index("value"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_infer_column_type_int() {
        let values = vec![serde_json::json!(1), serde_json::json!(2)];
        assert_eq!(infer_column_type(&values), ColumnType::Integer);
    }

    #[test]
    fn test_infer_column_type_mixed_numeric() {
        let values = vec![serde_json::json!(1), serde_json::json!(2.5)];
        assert_eq!(infer_column_type(&values), ColumnType::Float);
    }

    #[test]
    fn test_infer_column_type_string_wins() {
        let values = vec![serde_json::json!(1), serde_json::json!("a")];
        assert_eq!(infer_column_type(&values), ColumnType::String);
    }

    #[test]
    fn test_infer_column_type_timestamp() {
        let values = vec![
            serde_json::json!("2024-01-15T00:00:00+00:00"),
            serde_json::Value::Null,
            serde_json::json!("2024-06-01T12:30:00Z"),
        ];
        assert_eq!(infer_column_type(&values), ColumnType::Timestamp);
        // One non-timestamp string demotes the column to String.
        let values = vec![
            serde_json::json!("2024-01-15T00:00:00+00:00"),
            serde_json::json!("not a date"),
        ];
        assert_eq!(infer_column_type(&values), ColumnType::String);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("42"), serde_json::json!(42));
        assert_eq!(parse_cell("-3.5"), serde_json::json!(-3.5));
        assert_eq!(parse_cell("true"), serde_json::json!(true));
        assert_eq!(parse_cell("hello"), serde_json::json!("hello"));
        assert_eq!(parse_cell(""), serde_json::Value::Null);
        assert_eq!(parse_cell("  "), serde_json::Value::Null);
    }
}
