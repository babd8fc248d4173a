//! Pipeline report: structured record of one run.

use crate::error::StageError;
use crate::stage::StageOutcome;
use chrono::{DateTime, Utc};
use mizu_core::ResultLog;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Clone, Debug)]
pub struct PipelineReport {
    pub run_id: String,
    pub pipeline: String,
    pub actor: String,
    pub address: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub total_wall_ms: u64,
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log: Option<ResultLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
    Cancelled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct StageRecord {
    pub name: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub writes: BTreeMap<String, String>,
    pub wall_ms: u64,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Failure {
    pub stage: String,
    pub kind: String,
    pub message: String,
}

impl PipelineReport {
    pub fn new(pipeline: &str, actor: &str, address: &str, stages: &[&str]) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            pipeline: pipeline.into(),
            actor: actor.into(),
            address: address.into(),
            started: Utc::now(),
            ended: None,
            outcome: Outcome::Pending,
            total_wall_ms: 0,
            stages: stages
                .iter()
                .map(|name| StageRecord {
                    name: name.to_string(),
                    status: StageStatus::Pending,
                    digest: None,
                    writes: BTreeMap::new(),
                    wall_ms: 0,
                    started: None,
                    ended: None,
                    note: None,
                })
                .collect(),
            last_log: None,
            failure: None,
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.name == name)
    }

    fn stage_mut(&mut self, name: &str) -> Option<&mut StageRecord> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    pub fn start_stage(&mut self, name: &str) {
        if let Some(stage) = self.stage_mut(name) {
            stage.status = StageStatus::Running;
            stage.started = Some(Utc::now());
        }
    }

    pub fn skip_stage(&mut self, name: &str, reason: &str) {
        if let Some(stage) = self.stage_mut(name) {
            stage.status = StageStatus::Skipped;
            stage.note = Some(reason.to_string());
        }
    }

    pub fn finish_stage(&mut self, name: &str, outcome: &StageOutcome) {
        if let Some(stage) = self.stage_mut(name) {
            stage.digest = outcome.log.digest().map(str::to_string);
            stage.writes = outcome
                .writes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            close(stage, StageStatus::Success);
        }
        self.last_log = Some(outcome.log.clone());
    }

    pub fn fail_stage(&mut self, name: &str, error: &StageError) {
        if let Some(stage) = self.stage_mut(name) {
            stage.note = Some(error.to_string());
            close(stage, StageStatus::Failed);
        }
        self.failure = Some(Failure {
            stage: name.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }

    pub fn finalize(&mut self, outcome: Outcome) {
        let ended = Utc::now();
        self.outcome = outcome;
        self.ended = Some(ended);
        self.total_wall_ms = (ended - self.started).num_milliseconds().max(0) as u64;
    }

    /// Every key committed during this run, in stage order.
    pub fn store_delta(&self) -> Vec<(&str, &str)> {
        self.stages
            .iter()
            .flat_map(|s| s.writes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    pub fn run_log_line(&self) -> String {
        format!(
            "| {} | {} | {} | {} | {} |",
            self.run_id,
            self.pipeline,
            self.actor,
            self.started.format("%Y-%m-%dT%H:%M:%S"),
            self.outcome,
        )
    }
}

fn close(stage: &mut StageRecord, status: StageStatus) {
    let ended = Utc::now();
    stage.status = status;
    stage.ended = Some(ended);
    if let Some(start) = stage.started {
        stage.wall_ms = (ended - start).num_milliseconds().max(0) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizu_chain::CallRequest;
    use mizu_core::{Scalar, StoreKey};

    fn outcome() -> StageOutcome {
        let mut writes = BTreeMap::new();
        writes.insert(StoreKey::parse("kiosk.id").unwrap(), Scalar::from("0xk"));
        StageOutcome {
            request: CallRequest::pay_sui(1).unwrap(),
            log: ResultLog::builder().digest("D1").created("0x2::kiosk::Kiosk", "0xk").build(),
            writes,
        }
    }

    #[test]
    fn report_lifecycle() {
        let mut r = PipelineReport::new("claim", "user1", "0xa", &["create_kiosk", "claim_mint"]);
        r.start_stage("create_kiosk");
        assert_eq!(r.stage("create_kiosk").unwrap().status, StageStatus::Running);

        r.finish_stage("create_kiosk", &outcome());
        r.finalize(Outcome::Success);

        let stage = r.stage("create_kiosk").unwrap();
        assert_eq!(stage.status, StageStatus::Success);
        assert_eq!(stage.digest.as_deref(), Some("D1"));
        assert_eq!(r.stage("claim_mint").unwrap().status, StageStatus::Pending);
        assert_eq!(r.store_delta(), vec![("kiosk.id", "0xk")]);
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn report_yaml_has_outcome_and_stages() {
        let mut r = PipelineReport::new("reveal", "user1", "0xa", &["reveal_mint"]);
        r.skip_stage("reveal_mint", "writes already present");
        r.finalize(Outcome::Failure);
        let yaml = r.to_yaml();
        assert!(yaml.contains("reveal_mint"));
        assert!(yaml.contains("skipped"));
        assert!(yaml.contains("failure"));
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn run_log_line_format() {
        let r = PipelineReport::new("cooler", "user1", "0xa", &[]);
        let line = r.run_log_line();
        assert!(line.contains("cooler"));
        assert!(line.contains("pending"));
    }
}
