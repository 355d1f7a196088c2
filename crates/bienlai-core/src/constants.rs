//! Workspace-wide constants.

/// Hard ceiling on an uploaded payload, enforced by the gateway before any
/// classifier call. 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Default number of accepted uploads per owner scope per calendar day.
pub const DEFAULT_DAILY_UPLOAD_LIMIT: i32 = 30;

/// Bounded timeout for outbound classifier / gateway calls.
pub const EXTERNAL_CALL_TIMEOUT_SECS: u64 = 20;

/// Generic image labels that the fallback classifier accepts as
/// document-like. Consulted only when the primary classifier call fails.
pub const DOCUMENT_LABEL_ALLOWLIST: &[&str] = &[
    "paper",
    "document",
    "text",
    "receipt",
    "menu",
    "label",
    "envelope",
    "notebook",
    "book",
    "web page",
    "letter opener",
];
