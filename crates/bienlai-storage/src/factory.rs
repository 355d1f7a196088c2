//! Config-driven construction of the storage backend.

use std::sync::Arc;

use bienlai_core::{GatewayConfig, StorageBackend};

use crate::traits::{Storage, StorageError, StorageResult};

/// Build the storage backend selected by configuration.
pub async fn create_storage(config: &GatewayConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not set".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string());

            let storage = crate::s3::S3Storage::new(
                bucket,
                region,
                config.s3_endpoint.clone(),
                config.public_base_url.clone(),
            )
            .await?;

            tracing::info!(backend = "s3", "Storage backend initialized");
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "Built without the storage-s3 feature".to_string(),
        )),
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = crate::local::LocalStorage::new(
                config.local_storage_path.clone(),
                config.public_base_url.clone(),
            )
            .await?;

            tracing::info!(
                backend = "local",
                path = %config.local_storage_path,
                "Storage backend initialized"
            );
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Built without the storage-local feature".to_string(),
        )),
    }
}
