//! Tabular format codec — CSV, Parquet and JSON.
//!
//! Both directions materialize the whole object in memory. Parquet goes
//! through the Arrow JSON reader/writer so cell values stay
//! [`serde_json::Value`] at the table boundary.

use crate::error::PipelineError;
use crate::table::{self, ColumnType, Table};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A supported tabular file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Csv,
    #[default]
    Parquet,
    Json,
}

impl Format {
    /// Select a format by an object key's file-extension suffix.
    pub fn from_key(key: &str) -> Result<Self, PipelineError> {
        if key.ends_with(".csv") {
            Ok(Self::Csv)
        } else if key.ends_with(".parquet") {
            Ok(Self::Parquet)
        } else if key.ends_with(".json") {
            Ok(Self::Json)
        } else {
            Err(PipelineError::unsupported_format(format!(
                "Unsupported file format: {key}"
            )))
        }
    }
}

impl FromStr for Format {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            "json" => Ok(Self::Json),
            other => Err(PipelineError::unsupported_format(format!(
                "Unsupported format: {other}"
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Parquet => write!(f, "parquet"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse raw bytes of the given format into a table.
pub fn decode(data: &[u8], format: Format) -> Result<Table, PipelineError> {
    match format {
        Format::Csv => decode_csv(data),
        Format::Parquet => decode_parquet(data),
        Format::Json => decode_json(data),
    }
}

/// Serialize a table to raw bytes of the given format.
pub fn encode(table: &Table, format: Format) -> Result<Vec<u8>, PipelineError> {
    match format {
        Format::Csv => encode_csv(table),
        Format::Parquet => encode_parquet(table),
        Format::Json => encode_json(table),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn decode_csv(data: &[u8]) -> Result<Table, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(table::parse_cell).collect());
    }
    Ok(Table::new(columns, rows))
}

fn encode_csv(table: &Table) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            let record: Vec<String> = row.iter().map(cell_to_text).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

fn cell_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON (records orientation: array of objects)
// ---------------------------------------------------------------------------

fn decode_json(data: &[u8]) -> Result<Table, PipelineError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let items = match value {
        serde_json::Value::Array(arr) => arr,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => {
            return Err(PipelineError::unsupported_format(
                "JSON object must be an array of records or a single record",
            ));
        }
    };

    let columns: Vec<String> = match items.first() {
        Some(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        Some(_) => vec!["value".to_string()],
        None => return Ok(Table::empty()),
    };

    let rows = items
        .iter()
        .map(|item| {
            columns
                .iter()
                .map(|col| item.get(col).cloned().unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();
    Ok(Table::new(columns, rows))
}

fn encode_json(table: &Table) -> Result<Vec<u8>, PipelineError> {
    let records: Vec<serde_json::Value> = table
        .rows
        .iter()
        .map(|row| row_to_record(&table.columns, row))
        .collect();
    Ok(serde_json::to_vec(&records)?)
}

fn row_to_record(columns: &[String], row: &[serde_json::Value]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = columns
        .iter()
        .zip(row.iter())
        .map(|(col, cell)| (col.clone(), cell.clone()))
        .collect();
    serde_json::Value::Object(map)
}

// ---------------------------------------------------------------------------
// Parquet (via Arrow)
// ---------------------------------------------------------------------------

fn decode_parquet(data: &[u8]) -> Result<Table, PipelineError> {
    let builder = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(
        bytes::Bytes::copy_from_slice(data),
    )?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut rows = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        if batch.num_rows() == 0 {
            continue;
        }
        // Lower the batch to JSON records; absent keys are nulls.
        let mut writer = arrow::json::ArrayWriter::new(Vec::new());
        writer.write(&batch)?;
        writer.finish()?;
        let records: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(&writer.into_inner())?;
        for record in records {
            rows.push(
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(serde_json::Value::Null))
                    .collect(),
            );
        }
    }
    Ok(Table::new(columns, rows))
}

fn encode_parquet(table: &Table) -> Result<Vec<u8>, PipelineError> {
    let schema = Arc::new(arrow_schema(table));
    let batch = if table.rows.is_empty() {
        RecordBatch::new_empty(schema.clone())
    } else {
        let records: Vec<serde_json::Value> = table
            .rows
            .iter()
            .map(|row| row_to_record(&table.columns, row))
            .collect();
        let mut decoder = arrow::json::ReaderBuilder::new(schema.clone())
            .with_coerce_primitive(true)
            .build_decoder()?;
        decoder.serialize(&records)?;
        decoder
            .flush()?
            .unwrap_or_else(|| RecordBatch::new_empty(schema.clone()))
    };

    let mut buf = Vec::new();
    let mut writer = parquet::arrow::ArrowWriter::try_new(&mut buf, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Build an Arrow schema from the table's inferred column types. Columns
/// with no non-null values fall back to Utf8 so the writer accepts them.
fn arrow_schema(table: &Table) -> Schema {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<serde_json::Value> = table.column_values(i).cloned().collect();
            let data_type = match table::infer_column_type(&values) {
                ColumnType::Integer => DataType::Int64,
                ColumnType::Float => DataType::Float64,
                ColumnType::Boolean => DataType::Boolean,
                _ => DataType::Utf8,
            };
            Field::new(name, data_type, true)
        })
        .collect();
    Schema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_table() -> Table {
        Table::new(
            vec!["id".into(), "value".into()],
            vec![
                vec![serde_json::json!(1), serde_json::json!(5)],
                vec![serde_json::json!(2), serde_json::json!(-3)],
                vec![serde_json::json!(3), serde_json::Value::Null],
            ],
        )
    }

    #[test]
    fn test_format_from_key() {
        assert_eq!(Format::from_key("raw/data.csv").unwrap(), Format::Csv);
        assert_eq!(
            Format::from_key("out/data.parquet").unwrap(),
            Format::Parquet
        );
        assert_eq!(Format::from_key("data.json").unwrap(), Format::Json);
        assert!(Format::from_key("data.xml").is_err());
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!("parquet".parse::<Format>().unwrap(), Format::Parquet);
        assert!(matches!(
            "avro".parse::<Format>(),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_default_format_is_parquet() {
        assert_eq!(Format::default(), Format::Parquet);
    }

    #[test]
    fn test_decode_csv_types_cells() {
        let data = b"id,value\n1,5\n2,-3\n3,\n";
        let table = decode(data, Format::Csv).unwrap();
        assert_eq!(table.columns, vec!["id", "value"]);
        assert_eq!(table.rows[0], vec![serde_json::json!(1), serde_json::json!(5)]);
        assert_eq!(table.rows[2][1], serde_json::Value::Null);
    }

    #[test]
    fn test_csv_round_trip() {
        let table = sample_table();
        let bytes = encode(&table, Format::Csv).unwrap();
        let decoded = decode(&bytes, Format::Csv).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_json_round_trip() {
        let table = sample_table();
        let bytes = encode(&table, Format::Json).unwrap();
        let decoded = decode(&bytes, Format::Json).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_json_decode_records() {
        let data = br#"[{"a": 1, "b": "x"}, {"a": 2}]"#;
        let table = decode(data, Format::Json).unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[1][1], serde_json::Value::Null);
    }

    #[test]
    fn test_parquet_round_trip() {
        let table = sample_table();
        let bytes = encode(&table, Format::Parquet).unwrap();
        let decoded = decode(&bytes, Format::Parquet).unwrap();
        assert_eq!(decoded.columns, table.columns);
        assert_eq!(decoded.rows, table.rows);
    }

    #[test]
    fn test_parquet_empty_table() {
        let table = Table::new(vec!["a".into(), "b".into()], Vec::new());
        let bytes = encode(&table, Format::Parquet).unwrap();
        let decoded = decode(&bytes, Format::Parquet).unwrap();
        assert_eq!(decoded.columns, vec!["a", "b"]);
        assert_eq!(decoded.row_count(), 0);
    }

    #[test]
    fn test_parquet_mixed_numeric_column() {
        let table = Table::new(
            vec!["x".into()],
            vec![vec![serde_json::json!(1)], vec![serde_json::json!(2.5)]],
        );
        let bytes = encode(&table, Format::Parquet).unwrap();
        let decoded = decode(&bytes, Format::Parquet).unwrap();
        assert_eq!(decoded.rows[0][0], serde_json::json!(1.0));
        assert_eq!(decoded.rows[1][0], serde_json::json!(2.5));
    }
}
