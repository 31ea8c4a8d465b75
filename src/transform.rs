//! Transform engine: ordered operations over a table.
//!
//! Operations execute strictly in list order, each consuming the output of
//! the previous. An empty list is the identity. Unknown operation kinds
//! deserialize to [`TransformStep::Unknown`] and pass the table through
//! unchanged; callers may rely on forward-compatible descriptor lists being
//! partially ignored.

use crate::error::PipelineError;
use crate::filter::Condition;
use crate::table::Table;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single transform operation descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TransformStep {
    DropNulls {
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
    FillNulls {
        #[serde(default = "default_fill_value")]
        value: serde_json::Value,
    },
    Rename {
        mapping: HashMap<String, String>,
    },
    Filter {
        condition: String,
    },
    Aggregate {
        #[serde(default)]
        group_by: Vec<String>,
        #[serde(default)]
        aggregations: BTreeMap<String, AggFunc>,
    },
    AddColumn {
        name: String,
        value: serde_json::Value,
    },
    ConvertType {
        column: String,
        dtype: String,
    },
    #[serde(other)]
    Unknown,
}

fn default_fill_value() -> serde_json::Value {
    serde_json::json!(0)
}

/// Aggregation function for the `aggregate` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

/// Apply an ordered sequence of operations to a table.
pub fn apply(table: Table, steps: &[TransformStep]) -> Result<Table, PipelineError> {
    let mut table = table;
    for step in steps {
        table = apply_step(table, step)?;
    }
    Ok(table)
}

fn apply_step(mut table: Table, step: &TransformStep) -> Result<Table, PipelineError> {
    match step {
        TransformStep::DropNulls { columns } => {
            let indices = subset_indices(&table, columns.as_deref())?;
            table
                .rows
                .retain(|row| !indices.iter().any(|&i| row[i].is_null()));
            Ok(table)
        }
        TransformStep::FillNulls { value } => {
            for row in &mut table.rows {
                for cell in row.iter_mut() {
                    if cell.is_null() {
                        *cell = value.clone();
                    }
                }
            }
            Ok(table)
        }
        TransformStep::Rename { mapping } => {
            // Relabel simultaneously: every source name resolves against
            // the original column list before any column is renamed, so
            // swaps ({a→b, b→a}) and chains ({a→b, b→c}) do not depend on
            // map iteration order.
            let renames: Vec<(usize, String)> = mapping
                .iter()
                .map(|(from, to)| {
                    let index = table
                        .column_index(from)
                        .ok_or_else(|| PipelineError::column_not_found(from))?;
                    Ok((index, to.clone()))
                })
                .collect::<Result<_, PipelineError>>()?;
            for (index, to) in renames {
                table.columns[index] = to;
            }
            Ok(table)
        }
        TransformStep::Filter { condition } => {
            let bound = Condition::parse(condition)?.bind(&table)?;
            table.rows.retain(|row| bound.matches(row));
            Ok(table)
        }
        TransformStep::Aggregate {
            group_by,
            aggregations,
        } => aggregate(&table, group_by, aggregations),
        TransformStep::AddColumn { name, value } => {
            // An existing column of the same name is overwritten in place.
            if let Some(index) = table.column_index(name) {
                for row in &mut table.rows {
                    row[index] = value.clone();
                }
            } else {
                table.columns.push(name.clone());
                for row in &mut table.rows {
                    row.push(value.clone());
                }
            }
            Ok(table)
        }
        TransformStep::ConvertType { column, dtype } => convert_type(table, column, dtype),
        TransformStep::Unknown => Ok(table),
    }
}

fn subset_indices(
    table: &Table,
    columns: Option<&[String]>,
) -> Result<Vec<usize>, PipelineError> {
    match columns {
        Some(names) => names
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| PipelineError::column_not_found(name))
            })
            .collect(),
        None => Ok((0..table.column_count()).collect()),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn aggregate(
    table: &Table,
    group_by: &[String],
    aggregations: &BTreeMap<String, AggFunc>,
) -> Result<Table, PipelineError> {
    let key_indices: Vec<usize> = group_by
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| PipelineError::column_not_found(name))
        })
        .collect::<Result<_, _>>()?;
    let targets: Vec<(String, usize, AggFunc)> = aggregations
        .iter()
        .map(|(name, func)| {
            let index = table
                .column_index(name)
                .ok_or_else(|| PipelineError::column_not_found(name))?;
            Ok((name.clone(), index, *func))
        })
        .collect::<Result<_, PipelineError>>()?;

    // Group rows by stringified key tuple, keeping first-seen group order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<serde_json::Value>, Vec<Vec<serde_json::Value>>)> =
        HashMap::new();
    for row in &table.rows {
        let key_values: Vec<serde_json::Value> =
            key_indices.iter().map(|&i| row[i].clone()).collect();
        let key = serde_json::to_string(&key_values)?;
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            (key_values, vec![Vec::new(); targets.len()])
        });
        for (slot, (_, index, _)) in entry.1.iter_mut().zip(&targets) {
            slot.push(row[*index].clone());
        }
    }

    let mut columns = group_by.to_vec();
    columns.extend(targets.iter().map(|(name, _, _)| name.clone()));

    let mut rows = Vec::with_capacity(order.len());
    for key in order {
        let Some((key_values, collected)) = groups.remove(&key) else {
            continue;
        };
        let mut row = key_values;
        for (values, (_, _, func)) in collected.iter().zip(&targets) {
            row.push(reduce(values, *func));
        }
        rows.push(row);
    }
    Ok(Table::new(columns, rows))
}

fn reduce(values: &[serde_json::Value], func: AggFunc) -> serde_json::Value {
    let non_null: Vec<&serde_json::Value> = values.iter().filter(|v| !v.is_null()).collect();
    match func {
        AggFunc::Count => serde_json::Value::Number((non_null.len() as i64).into()),
        AggFunc::Sum => {
            let ints: Option<Vec<i64>> = non_null.iter().map(|v| v.as_i64()).collect();
            if let Some(ints) = ints {
                serde_json::Value::Number(ints.iter().sum::<i64>().into())
            } else {
                float_value(non_null.iter().filter_map(|v| v.as_f64()).sum())
            }
        }
        AggFunc::Mean => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            if nums.is_empty() {
                serde_json::Value::Null
            } else {
                float_value(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        AggFunc::Min => extremum(&non_null, true),
        AggFunc::Max => extremum(&non_null, false),
    }
}

fn extremum(values: &[&serde_json::Value], minimum: bool) -> serde_json::Value {
    let nums: Vec<&serde_json::Value> = values.iter().filter(|v| v.is_number()).copied().collect();
    if !nums.is_empty() {
        let best = nums.into_iter().reduce(|a, b| {
            let (af, bf) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            if (bf < af) == minimum { b } else { a }
        });
        return best.cloned().unwrap_or(serde_json::Value::Null);
    }
    let strings: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
    let best = if minimum {
        strings.into_iter().min()
    } else {
        strings.into_iter().max()
    };
    best.map(|s| serde_json::Value::String(s.to_string()))
        .unwrap_or(serde_json::Value::Null)
}

fn float_value(x: f64) -> serde_json::Value {
    serde_json::Number::from_f64(x)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// Type conversion
// ---------------------------------------------------------------------------

fn convert_type(mut table: Table, column: &str, dtype: &str) -> Result<Table, PipelineError> {
    let index = table
        .column_index(column)
        .ok_or_else(|| PipelineError::column_not_found(column))?;
    for row in &mut table.rows {
        // Nulls pass through unchanged.
        if row[index].is_null() {
            continue;
        }
        row[index] = convert_value(&row[index], dtype, column)?;
    }
    Ok(table)
}

fn convert_value(
    value: &serde_json::Value,
    dtype: &str,
    column: &str,
) -> Result<serde_json::Value, PipelineError> {
    use serde_json::Value;
    let fail = || {
        PipelineError::type_conversion(format!(
            "Cannot cast {value} in column '{column}' to {dtype}"
        ))
    };
    match dtype {
        "int" | "int64" => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(|i| Value::Number(i.into()))
                .ok_or_else(fail),
            Value::Bool(b) => Ok(Value::Number(i64::from(*b).into())),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
                .map(|i| Value::Number(i.into()))
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        "float" | "float64" => match value {
            Value::Number(n) => n.as_f64().map(float_value).ok_or_else(fail),
            Value::Bool(b) => Ok(float_value(f64::from(u8::from(*b)))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .map(float_value)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        "str" | "string" => match value {
            Value::String(_) => Ok(value.clone()),
            other => Ok(Value::String(other.to_string())),
        },
        "bool" | "boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)).ok_or_else(fail),
            Value::String(s) => match s.trim() {
                "true" | "True" | "1" => Ok(Value::Bool(true)),
                "false" | "False" | "0" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        "datetime" => match value {
            Value::String(s) => parse_datetime(s)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(fail),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        _ => Err(PipelineError::type_conversion(format!(
            "Unknown target type: {dtype}"
        ))),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
    }
    None
}
