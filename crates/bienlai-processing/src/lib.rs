//! Client-side processing stages of the receipt intake pipeline:
//! content fingerprinting and best-effort image compression.

pub mod compression;
pub mod hasher;

pub use compression::{CompressedImage, CompressionSettings, ImageCompressor};
pub use hasher::fingerprint;
