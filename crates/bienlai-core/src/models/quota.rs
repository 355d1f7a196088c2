use serde::{Deserialize, Serialize};

/// Result of an atomic quota check-and-increment against the daily counter
/// for one owner scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Counter value after this call (unchanged when not allowed).
    pub current_count: i32,
    /// Uploads remaining today, zero when not allowed.
    pub remaining: i32,
}

impl QuotaDecision {
    pub fn allowed(current_count: i32, limit: i32) -> Self {
        QuotaDecision {
            allowed: true,
            current_count,
            remaining: (limit - current_count).max(0),
        }
    }

    pub fn denied(current_count: i32) -> Self {
        QuotaDecision {
            allowed: false,
            current_count,
            remaining: 0,
        }
    }
}
