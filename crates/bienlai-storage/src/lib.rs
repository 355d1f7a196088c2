//! Object storage abstraction for uploaded receipt images.
//!
//! Keys are caller-specified storage keys; public URLs are built from the
//! configured public base URL plus the key. Writes are not idempotent:
//! uploading twice with the same key overwrites the stored object. Duplicate
//! prevention lives in the client-side fingerprint path, not here.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use bienlai_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
