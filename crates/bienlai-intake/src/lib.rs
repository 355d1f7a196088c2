//! Client-side receipt intake pipeline.
//!
//! Drives one receipt attempt through a linear stage machine: quota check,
//! fingerprinting and duplicate lookup, compression, upload through the
//! gateway, line-item analysis, user review, and the final commit. Every
//! collaborator sits behind a trait so the whole pipeline runs against
//! in-memory fakes in tests.

pub mod adapters;
pub mod context;
pub mod gateway_client;
pub mod pipeline;
pub mod stage;
pub mod traits;

pub use context::IntakeContext;
pub use gateway_client::GatewayClient;
pub use pipeline::{IntakePipeline, ReviewSession};
pub use stage::{IntakeError, IntakeStage};
pub use traits::{DuplicateIndex, ExpenseSink, QuotaGate, ReceiptAnalyzer, ReceiptUploader};
