//! Pipeline: an ordered list of stages run against one store.
//!
//! Stages run one at a time; the next starts only after the previous stage's
//! writes are committed and flushed. The first failure ends the run, leaving
//! later stages unattempted and earlier commits in place. There is no retry.

use crate::context::SessionContext;
use crate::error::{BuildError, StageError};
use crate::report::{Outcome, PipelineReport};
use crate::stage::{Extract, StageSpec, StageSpecBuilder};
use mizu_core::StoreKey;
use mizu_store::StateStore;
use std::collections::BTreeMap;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageSpecBuilder>,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: StageSpecBuilder) -> Self {
        self.stages.push(stage);
        self
    }

    /// Build every stage and check that each key has a single writer.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        if self.stages.is_empty() {
            return Err(BuildError::Empty(self.name));
        }

        let mut stages: Vec<StageSpec> = Vec::with_capacity(self.stages.len());
        let mut writers: BTreeMap<StoreKey, String> = BTreeMap::new();
        for builder in self.stages {
            if stages.iter().any(|s| s.name() == builder.name()) {
                return Err(BuildError::DuplicateStage(builder.name().to_string()));
            }
            let stage = builder.build()?;
            for write in stage.writes() {
                let claimed = writers
                    .iter()
                    .find(|(k, _)| **k == write.key || k.overlaps(&write.key));
                if let Some((_, first)) = claimed {
                    return Err(BuildError::DuplicateWriter {
                        key: write.key.to_string(),
                        first: first.clone(),
                        second: stage.name().to_string(),
                    });
                }
                writers.insert(write.key.clone(), stage.name().to_string());
            }
            stages.push(stage);
        }

        Ok(Pipeline {
            name: self.name,
            stages,
        })
    }
}

/// Knobs for one run.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Start at this stage; earlier ones are reported as skipped.
    pub from: Option<String>,
    /// Skip stages whose writes are all present already.
    pub resume: bool,
    pub cancel: CancellationToken,
}

/// Report plus the error that ended the run, if any.
#[derive(Debug)]
pub struct PipelineResult {
    pub report: PipelineReport,
    pub error: Option<StageError>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.report.is_success()
    }

    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }

    pub fn into_result(self) -> Result<PipelineReport, StageError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pipeline {
    name: String,
    stages: Vec<StageSpec>,
}

impl Pipeline {
    pub fn builder(name: &str) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn position(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name() == stage)
    }

    pub async fn run(&self, store: &mut StateStore, ctx: &SessionContext) -> PipelineResult {
        self.execute(store, ctx, 0, &RunOptions::default()).await
    }

    pub async fn run_from(
        &self,
        stage: &str,
        store: &mut StateStore,
        ctx: &SessionContext,
    ) -> Result<PipelineResult, BuildError> {
        let options = RunOptions {
            from: Some(stage.to_string()),
            ..RunOptions::default()
        };
        self.run_with(store, ctx, options).await
    }

    pub async fn run_with(
        &self,
        store: &mut StateStore,
        ctx: &SessionContext,
        options: RunOptions,
    ) -> Result<PipelineResult, BuildError> {
        let start = match &options.from {
            Some(name) => self
                .position(name)
                .ok_or_else(|| BuildError::UnknownStage(name.clone()))?,
            None => 0,
        };
        Ok(self.execute(store, ctx, start, &options).await)
    }

    async fn execute(
        &self,
        store: &mut StateStore,
        ctx: &SessionContext,
        start: usize,
        options: &RunOptions,
    ) -> PipelineResult {
        let mut report =
            PipelineReport::new(&self.name, ctx.actor(), ctx.address(), &self.stage_names());
        info!(
            pipeline = self.name.as_str(),
            actor = ctx.actor(),
            run_id = report.run_id.as_str(),
            store = store.name(),
            "pipeline started ({} stages)",
            self.stages.len()
        );

        for (index, stage) in self.stages.iter().enumerate() {
            if index < start {
                report.skip_stage(stage.name(), "before start stage");
                continue;
            }
            if options.resume && stage.is_satisfied(store) {
                info!(stage = stage.name(), "writes already present, skipping");
                report.skip_stage(stage.name(), "writes already present");
                continue;
            }

            report.start_stage(stage.name());
            match stage.run(store, ctx, &options.cancel).await {
                Ok(outcome) => report.finish_stage(stage.name(), &outcome),
                Err(err) => {
                    warn!(pipeline = self.name.as_str(), stage = stage.name(), kind = err.kind(), "{}", err);
                    report.fail_stage(stage.name(), &err);
                    report.finalize(if err.is_cancelled() {
                        Outcome::Cancelled
                    } else {
                        Outcome::Failure
                    });
                    return PipelineResult {
                        report,
                        error: Some(err),
                    };
                }
            }
        }

        report.finalize(Outcome::Success);
        info!(
            pipeline = self.name.as_str(),
            wall_ms = report.total_wall_ms,
            "pipeline complete"
        );
        PipelineResult {
            report,
            error: None,
        }
    }

    /// What each stage would read, write and submit, without submitting.
    ///
    /// Reads produced by an earlier stage in the plan are reported as such; a
    /// request is only built when every read of the stage resolves now.
    pub fn plan(&self, store: &StateStore, sender: &str) -> Vec<StagePlan> {
        let mut produced: BTreeMap<StoreKey, String> = BTreeMap::new();
        let mut plans = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            // Values known now, for rendering expected types.
            let mut vars = BTreeMap::new();
            let reads: Vec<(StoreKey, ReadPlan)> = stage
                .reads()
                .iter()
                .map(|key| {
                    let plan = if let Some(by) = produced.get(key) {
                        ReadPlan::ProducedBy(by.clone())
                    } else {
                        match store.read(key) {
                            Ok(v) => match v.as_scalar() {
                                Some(s) => {
                                    vars.insert(key.to_string(), s.to_string());
                                    ReadPlan::Resolved(s.to_string())
                                }
                                None => ReadPlan::Record,
                            },
                            Err(_) => ReadPlan::Missing,
                        }
                    };
                    (key.clone(), plan)
                })
                .collect();

            let all_resolved = reads.iter().all(|(_, r)| matches!(r, ReadPlan::Resolved(_)));
            let request = if all_resolved {
                stage
                    .resolve(store, sender)
                    .and_then(|inputs| stage.build_request(&inputs))
                    .map(|r| r.describe())
                    .map_err(|e| e.to_string())
            } else {
                Err("reads not yet available".to_string())
            };

            let writes = stage
                .writes()
                .iter()
                .map(|w| {
                    let expected = match &w.extract {
                        Extract::Created(t) => t.render(&vars).unwrap_or_else(|_| t.to_string()),
                        Extract::PublishedPackage => crate::stage::PUBLISHED_PACKAGE.to_string(),
                    };
                    produced.insert(w.key.clone(), stage.name().to_string());
                    (w.key.clone(), expected)
                })
                .collect();

            plans.push(StagePlan {
                name: stage.name().to_string(),
                reads,
                writes,
                request,
            });
        }
        plans
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadPlan {
    Resolved(String),
    ProducedBy(String),
    Missing,
    /// Only nested keys exist under this key.
    Record,
}

#[derive(Clone, Debug)]
pub struct StagePlan {
    pub name: String,
    pub reads: Vec<(StoreKey, ReadPlan)>,
    pub writes: Vec<(StoreKey, String)>,
    pub request: Result<String, String>,
}

impl StagePlan {
    pub fn is_runnable(&self) -> bool {
        self.reads
            .iter()
            .all(|(_, r)| !matches!(r, ReadPlan::Missing | ReadPlan::Record))
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_runnable() { "[ ]" } else { "[!]" };
        writeln!(f, "{} {}", mark, self.name)?;
        for (key, read) in &self.reads {
            match read {
                ReadPlan::Resolved(v) => writeln!(f, "    read  {} = {}", key, v)?,
                ReadPlan::ProducedBy(stage) => writeln!(f, "    read  {} <- {}", key, stage)?,
                ReadPlan::Missing => writeln!(f, "    read  {} MISSING", key)?,
                ReadPlan::Record => writeln!(f, "    read  {} RECORD (expected a single value)", key)?,
            }
        }
        match &self.request {
            Ok(desc) => writeln!(f, "    submit {}", desc)?,
            Err(why) => writeln!(f, "    submit ({})", why)?,
        }
        for (key, expected) in &self.writes {
            writeln!(f, "    write {} := {}", key, expected)?;
        }
        Ok(())
    }
}
