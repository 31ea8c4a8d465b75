//! # cloudpipe — Cloud ETL Pipeline
//!
//! Moves tabular data between cloud object storage and a transformed
//! destination: extract an object (CSV, Parquet or JSON), apply an ordered
//! sequence of transform operations, load the result back, and report run
//! statistics. A small set of data-quality rules can be evaluated against
//! any table.
//!
//! Parsing and serialization are delegated to the `csv`, `arrow`/`parquet`
//! and `serde_json` crates; object storage I/O goes through `object_store`
//! (AWS S3 and Google Cloud Storage backends).
//!
//! ```no_run
//! use cloudpipe::{CloudDataPipeline, CloudProvider, Format, PipelineConfig, TransformStep};
//!
//! # async fn example() -> Result<(), cloudpipe::PipelineError> {
//! let config = PipelineConfig::new(CloudProvider::Aws, "my-data-bucket");
//! let pipeline = CloudDataPipeline::new(&config)?;
//!
//! let steps = vec![
//!     TransformStep::DropNulls { columns: Some(vec!["value".into()]) },
//!     TransformStep::Filter { condition: "value > 0".into() },
//! ];
//! let stats = pipeline
//!     .run("raw/data.csv", "processed/data.parquet", &steps, Format::Parquet)
//!     .await?;
//! println!("{} rows in, {} rows out", stats.input_rows, stats.output_rows);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
mod filter;
pub mod pipeline;
pub mod storage;
pub mod table;
pub mod transform;
pub mod validate;

pub use codec::Format;
pub use config::{CloudProvider, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{CloudDataPipeline, RunStats};
pub use storage::StorageGateway;
pub use table::{ColumnType, Table};
pub use transform::{AggFunc, TransformStep};
pub use validate::{QualityReport, RuleOutcome, ValidationRule};
