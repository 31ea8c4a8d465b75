//! Object storage gateway.
//!
//! One gateway instance is bound to a single provider, bucket and region.
//! The backends are the `object_store` implementations for AWS S3 and
//! Google Cloud Storage; credentials come from the environment, as the
//! respective SDKs expect.

use crate::config::{CloudProvider, PipelineConfig};
use crate::error::PipelineError;
use bytes::Bytes;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use std::sync::Arc;

/// Thin fetch/store wrapper around a configured object store.
#[derive(Clone)]
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
}

impl StorageGateway {
    /// Build a gateway for the configured provider and bucket.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store: Arc<dyn ObjectStore> = match config.provider {
            CloudProvider::Aws => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket_name)
                    .with_region(&config.region)
                    .build()?,
            ),
            CloudProvider::Gcp => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(&config.bucket_name)
                    .build()?,
            ),
        };
        tracing::info!(
            provider = %config.provider,
            bucket = %config.bucket_name,
            "Initialized storage gateway"
        );
        Ok(Self {
            store,
            bucket_name: config.bucket_name.clone(),
        })
    }

    /// Build a gateway over an arbitrary store. Tests use
    /// `object_store::memory::InMemory` here.
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket_name: impl Into<String>) -> Self {
        Self {
            store,
            bucket_name: bucket_name.into(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Fetch the full object at `key`.
    pub async fn fetch(&self, key: &str) -> Result<Bytes, PipelineError> {
        let result = self.store.get(&Path::from(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Store `data` at `key`, replacing any existing object.
    pub async fn store(&self, key: &str, data: Vec<u8>) -> Result<(), PipelineError> {
        self.store
            .put(&Path::from(key), object_store::PutPayload::from(data))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageGateway")
            .field("bucket_name", &self.bucket_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_store_then_fetch() {
        let gateway = StorageGateway::with_store(Arc::new(InMemory::new()), "test-bucket");
        gateway.store("raw/data.csv", b"id,value\n1,5\n".to_vec())
            .await
            .unwrap();
        let bytes = gateway.fetch("raw/data.csv").await.unwrap();
        assert_eq!(&bytes[..], b"id,value\n1,5\n");
    }

    #[tokio::test]
    async fn test_fetch_missing_key_is_storage_error() {
        let gateway = StorageGateway::with_store(Arc::new(InMemory::new()), "test-bucket");
        let err = gateway.fetch("missing/key.csv").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let gateway = StorageGateway::with_store(Arc::new(InMemory::new()), "test-bucket");
        gateway.store("k", b"old".to_vec()).await.unwrap();
        gateway.store("k", b"new".to_vec()).await.unwrap();
        assert_eq!(&gateway.fetch("k").await.unwrap()[..], b"new");
    }
}
