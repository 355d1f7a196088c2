use serde::{Deserialize, Serialize};

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" => Some(StorageBackend::S3),
            "local" => Some(StorageBackend::Local),
            _ => None,
        }
    }
}
