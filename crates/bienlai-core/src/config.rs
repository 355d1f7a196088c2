//! Configuration module
//!
//! Environment-driven configuration for the upload gateway. Classifier
//! capability bindings are optional: when absent, the gateway skips the
//! classification stage entirely (explicit opt-out, not a failure).

use std::env;

use crate::constants::MAX_UPLOAD_BYTES;
use crate::storage_types::StorageBackend;

const DEFAULT_SERVER_PORT: u16 = 8787;
const DEFAULT_VISION_MODEL: &str = "claude-sonnet-4-20250514";

/// Upload gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Public base URL used to build the returned receipt URLs.
    pub public_base_url: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: String,
    // Classifier capability bindings (optional)
    pub anthropic_api_key: Option<String>,
    pub anthropic_vision_model: String,
    pub rekognition_region: Option<String>,
    // Upload limits
    pub max_upload_bytes: usize,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server_port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SERVER_PORT);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .map_err(|_| anyhow::anyhow!("PUBLIC_BASE_URL must be set"))?
            .trim_end_matches('/')
            .to_string();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => StorageBackend::parse(&raw)
                .ok_or_else(|| anyhow::anyhow!("Unknown STORAGE_BACKEND: {}", raw))?,
            Err(_) => StorageBackend::Local,
        };

        if storage_backend == StorageBackend::S3 && env::var("S3_BUCKET").is_err() {
            anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
        }

        Ok(GatewayConfig {
            server_port,
            cors_origins,
            environment,
            public_base_url,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/receipts".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            anthropic_vision_model: env::var("ANTHROPIC_VISION_MODEL")
                .unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string()),
            rekognition_region: env::var("REKOGNITION_REGION").ok().filter(|r| !r.is_empty()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_UPLOAD_BYTES),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Whether any classifier capability is bound.
    pub fn classifier_configured(&self) -> bool {
        self.anthropic_api_key.is_some() || self.rekognition_region.is_some()
    }
}
