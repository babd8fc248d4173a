//! mizu-pipeline - staged execution with object discovery
//!
//! A `Pipeline` runs `StageSpec`s strictly in order against one `StateStore`.
//! Each stage reads its inputs, submits one request, picks the identifiers it
//! needs out of the result log by type, and commits them before the next stage
//! starts. The first failure ends the run.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod template;

pub use context::SessionContext;
pub use error::{BuildError, StageError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult, ReadPlan, RunOptions, StagePlan};
pub use report::{Failure, Outcome, PipelineReport, StageRecord, StageStatus};
pub use stage::{Extract, PayloadBuilder, StageInputs, StageOutcome, StageSpec, StageSpecBuilder, WriteSpec};
pub use template::TypeTemplate;
