//! Pipeline stages and the stage-tagged error.

use std::fmt;

use bienlai_core::{AppError, ErrorMetadata};

/// Stages of one intake attempt, in order. The pipeline only ever moves
/// forward, except for the Saving failure case where the caller keeps the
/// review session and may retry the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Idle,
    CheckingLimit,
    Hashing,
    Compressing,
    Uploading,
    Analyzing,
    Review,
    Saving,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeStage::Idle => "idle",
            IntakeStage::CheckingLimit => "checking_limit",
            IntakeStage::Hashing => "hashing",
            IntakeStage::Compressing => "compressing",
            IntakeStage::Uploading => "uploading",
            IntakeStage::Analyzing => "analyzing",
            IntakeStage::Review => "review",
            IntakeStage::Saving => "saving",
        };
        f.write_str(name)
    }
}

/// An intake failure, tagged with the stage it happened in. In-flight
/// artifacts (hash, compressed bytes, extracted items) are discarded when
/// one of these is returned from `begin`.
#[derive(Debug, thiserror::Error)]
#[error("intake failed at stage {stage}: {source}")]
pub struct IntakeError {
    pub stage: IntakeStage,
    #[source]
    pub source: AppError,
}

impl IntakeError {
    pub fn at(stage: IntakeStage, source: AppError) -> Self {
        IntakeError { stage, source }
    }

    /// User-facing message, safe to show verbatim.
    pub fn user_message(&self) -> String {
        self.source.client_message()
    }
}
