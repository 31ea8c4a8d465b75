//! End-to-end pipeline runs over an in-memory object store.

use cloudpipe::{
    CloudDataPipeline, Format, PipelineError, StorageGateway, TransformStep, ValidationRule,
};
use object_store::ObjectStore;
use object_store::memory::InMemory;
use object_store::path::Path;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn pipeline_over(store: Arc<InMemory>) -> CloudDataPipeline {
    CloudDataPipeline::with_gateway(StorageGateway::with_store(store, "test-bucket"))
}

async fn seed(store: &InMemory, key: &str, data: &[u8]) {
    store
        .put(&Path::from(key), object_store::PutPayload::from(data.to_vec()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_csv_to_parquet_end_to_end() {
    let store = Arc::new(InMemory::new());
    seed(&store, "raw/data.csv", b"id,value\n1,5\n2,-3\n3,\n").await;
    let pipeline = pipeline_over(store.clone());

    let steps = vec![
        TransformStep::DropNulls {
            columns: Some(vec!["value".into()]),
        },
        TransformStep::Filter {
            condition: "value > 0".into(),
        },
    ];
    let stats = pipeline
        .run("raw/data.csv", "processed/data.parquet", &steps, Format::Parquet)
        .await
        .unwrap();

    assert_eq!(stats.input_rows, 3);
    assert_eq!(stats.output_rows, 1);
    assert_eq!(stats.source, "raw/data.csv");
    assert_eq!(stats.destination, "processed/data.parquet");
    assert!(stats.rows_per_second >= 0.0);

    // Destination object decodes back to the single surviving row.
    let pipeline = pipeline_over(store);
    let table = pipeline.extract("processed/data.parquet").await.unwrap();
    assert_eq!(table.columns, vec!["id", "value"]);
    assert_eq!(
        table.rows,
        vec![vec![serde_json::json!(1), serde_json::json!(5)]]
    );
}

#[tokio::test]
async fn test_empty_transformation_spec_passes_table_through() {
    let store = Arc::new(InMemory::new());
    seed(&store, "in.csv", b"a,b\n1,x\n2,y\n").await;
    let pipeline = pipeline_over(store);

    let stats = pipeline
        .run("in.csv", "out.csv", &[], Format::Csv)
        .await
        .unwrap();
    assert_eq!(stats.input_rows, 2);
    assert_eq!(stats.output_rows, 2);

    let table = pipeline.extract("out.csv").await.unwrap();
    assert_eq!(table.columns, vec!["a", "b"]);
    assert_eq!(table.row_count(), 2);
}

#[tokio::test]
async fn test_json_source_and_destination() {
    let store = Arc::new(InMemory::new());
    seed(
        &store,
        "events.json",
        br#"[{"group": "a", "value": 1}, {"group": "a", "value": 3}, {"group": "b", "value": 5}]"#,
    )
    .await;
    let pipeline = pipeline_over(store);

    let steps: Vec<TransformStep> = serde_json::from_str(
        r#"[{"operation": "aggregate", "group_by": ["group"], "aggregations": {"value": "sum"}}]"#,
    )
    .unwrap();
    let stats = pipeline
        .run("events.json", "totals.json", &steps, Format::Json)
        .await
        .unwrap();
    assert_eq!(stats.input_rows, 3);
    assert_eq!(stats.output_rows, 2);

    let table = pipeline.extract("totals.json").await.unwrap();
    let mut rows = table.rows.clone();
    rows.sort_by_key(|r| r[0].as_str().map(str::to_string));
    assert_eq!(
        rows,
        vec![
            vec![serde_json::json!("a"), serde_json::json!(4)],
            vec![serde_json::json!("b"), serde_json::json!(5)],
        ]
    );
}

#[tokio::test]
async fn test_unsupported_source_extension() {
    let store = Arc::new(InMemory::new());
    seed(&store, "data.xml", b"<rows/>").await;
    let pipeline = pipeline_over(store);

    let err = pipeline
        .run("data.xml", "out.parquet", &[], Format::Parquet)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_missing_source_aborts_without_writing_destination() {
    let store = Arc::new(InMemory::new());
    let pipeline = pipeline_over(store.clone());

    let err = pipeline
        .run("absent.csv", "out.parquet", &[], Format::Parquet)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));
    assert!(store.get(&Path::from("out.parquet")).await.is_err());
}

#[tokio::test]
async fn test_transform_failure_aborts_before_load() {
    let store = Arc::new(InMemory::new());
    seed(&store, "in.csv", b"id\n1\n").await;
    let pipeline = pipeline_over(store.clone());

    let steps = vec![TransformStep::Filter {
        condition: "missing > 0".into(),
    }];
    let err = pipeline
        .run("in.csv", "out.parquet", &steps, Format::Parquet)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ColumnNotFound(_)));
    assert!(store.get(&Path::from("out.parquet")).await.is_err());
}

#[tokio::test]
async fn test_validate_data_quality_via_pipeline() {
    let store = Arc::new(InMemory::new());
    seed(&store, "in.csv", b"id,score\n1,5\n2,11\n2,3\n").await;
    let pipeline = pipeline_over(store);

    let table = pipeline.extract("in.csv").await.unwrap();
    let rules: Vec<ValidationRule> = serde_json::from_str(
        r#"[
            {"type": "not_null", "column": "id"},
            {"type": "unique", "column": "id"},
            {"type": "range", "column": "score", "min": 0, "max": 10}
        ]"#,
    )
    .unwrap();
    let report = pipeline.validate_data_quality(&table, &rules).unwrap();
    assert_eq!(report.total_rules, 3);
    assert_eq!(report.passed.len(), 1);
    assert_eq!(report.failed.len(), 2);
    assert!((report.pass_rate - 1.0 / 3.0).abs() < 1e-9);
}
