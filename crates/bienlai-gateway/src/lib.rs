//! Upload gateway for receipt images.
//!
//! One mutating endpoint: `PUT /?file=<key>` with raw image bytes. The
//! gateway enforces the size ceiling, runs the classifier chain when one is
//! configured, and writes admitted payloads to the storage backend.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
