//! MockSubmitter: deterministic ledger responses for testing
//!
//! Each submit pops the next behavior and records the request it was given, so
//! tests can assert both what a pipeline sent and how many times it sent.

use crate::call::CallRequest;
use crate::keypair::Keypair;
use crate::submitter::{SubmitError, SubmitResult, Submitter};
use mizu_core::ResultLog;
use tokio::sync::Mutex;

/// Mock behavior configuration
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Succeed with this change log
    Log(ResultLog),
    /// Fail at the transport level
    Error(String),
    /// The ledger refused the transaction
    Rejected(String),
    /// Succeed without a change log
    MissingLog,
    /// Never complete (for cancellation tests)
    Hang,
}

pub struct MockSubmitter {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<CallRequest>>,
}

impl MockSubmitter {
    /// Create a mock that always returns the same behavior
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock with a sequence of behaviors (consumed in order).
    /// Once exhausted every submit fails.
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors),
            ..Self::constant(MockBehavior::Error("mock: sequence exhausted".into()))
        }
    }

    pub async fn call_count(&self) -> usize {
        *self.call_count.lock().await
    }

    /// Every request submitted so far, in order.
    pub async fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_behavior(&self, request: &CallRequest) -> MockBehavior {
        *self.call_count.lock().await += 1;
        self.requests.lock().await.push(request.clone());

        let mut behaviors = self.behaviors.lock().await;
        if behaviors.is_empty() {
            self.default_behavior.clone()
        } else {
            behaviors.remove(0)
        }
    }
}

#[async_trait::async_trait]
impl Submitter for MockSubmitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &CallRequest, _signer: &Keypair) -> SubmitResult<ResultLog> {
        match self.next_behavior(request).await {
            MockBehavior::Log(log) => Ok(log),
            MockBehavior::Error(msg) => Err(SubmitError::RequestFailed(msg)),
            MockBehavior::Rejected(msg) => Err(SubmitError::Rejected(msg)),
            MockBehavior::MissingLog => Err(SubmitError::MissingLog),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
