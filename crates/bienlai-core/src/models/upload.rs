use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw binary payload plus the caller-declared content type.
///
/// Ephemeral and client-owned: exists only while a pipeline instance runs.
/// Only the compressed, uploaded derivative persists.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl ImageBlob {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        ImageBlob {
            data,
            content_type: content_type.into(),
        }
    }
}

/// Result of a successful gatekeeper call: a publicly resolvable URL, the
/// storage key and the stored byte size. Owned by the calling client after
/// creation and embedded into the eventual expense record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadDescriptor {
    pub url: String,
    pub filename: String,
    pub size: u64,
}
