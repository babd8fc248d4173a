//! Build-time and run-time pipeline errors

use mizu_chain::{PayloadError, SubmitError};
use mizu_core::StoreKey;
use thiserror::Error;

/// Raised while assembling a pipeline, before anything runs.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("stage '{stage}': {source}")]
    InvalidKey {
        stage: String,
        source: mizu_core::Error,
    },

    #[error("stage '{stage}': invalid type template '{template}': {reason}")]
    InvalidTemplate {
        stage: String,
        template: String,
        reason: String,
    },

    #[error("stage '{stage}': placeholder '{{{placeholder}}}' is not one of its reads")]
    UndeclaredPlaceholder { stage: String, placeholder: String },

    #[error("key '{key}' is written by both '{first}' and '{second}'")]
    DuplicateWriter {
        key: String,
        first: String,
        second: String,
    },

    #[error("stage '{0}' has no payload builder")]
    MissingPayload(String),

    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("pipeline '{0}' has no stages")]
    Empty(String),
}

/// Why a stage stopped. Every variant names the stage.
#[derive(Error, Debug)]
pub enum StageError {
    /// The key is absent, or holds a record where a single value is needed.
    #[error("stage '{stage}': unresolved dependency '{key}'{}", shape_note(.found_record))]
    UnresolvedDependency {
        stage: String,
        key: StoreKey,
        found_record: bool,
    },

    #[error("stage '{stage}': expected entity not found for '{key}': {expected_type}")]
    ExpectedEntityNotFound {
        stage: String,
        key: StoreKey,
        expected_type: String,
    },

    #[error("stage '{stage}': submission failed: {source}")]
    SubmissionFailed { stage: String, source: SubmitError },

    #[error("stage '{stage}': payload rejected: {source}")]
    Payload { stage: String, source: PayloadError },

    #[error("stage '{stage}': store error: {source}")]
    Store {
        stage: String,
        source: mizu_core::Error,
    },

    #[error("stage '{stage}': cancelled")]
    Cancelled { stage: String },
}

fn shape_note(found_record: &bool) -> &'static str {
    if *found_record {
        " (found a record, expected a single value)"
    } else {
        ""
    }
}

impl StageError {
    pub fn stage(&self) -> &str {
        match self {
            Self::UnresolvedDependency { stage, .. }
            | Self::ExpectedEntityNotFound { stage, .. }
            | Self::SubmissionFailed { stage, .. }
            | Self::Payload { stage, .. }
            | Self::Store { stage, .. }
            | Self::Cancelled { stage } => stage,
        }
    }

    /// Stable snake_case name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnresolvedDependency { .. } => "unresolved_dependency",
            Self::ExpectedEntityNotFound { .. } => "expected_entity_not_found",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::Payload { .. } => "payload",
            Self::Store { .. } => "store",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
