//! Submitter trait: the only way a stage talks to the ledger.

use crate::call::CallRequest;
use crate::keypair::Keypair;
use async_trait::async_trait;
use mizu_core::ResultLog;

pub type SubmitResult<T> = Result<T, SubmitError>;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("response carried no object changes")]
    MissingLog,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl SubmitError {
    /// True when the ledger accepted the request and refused the transaction.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Signs and executes one request, returning the change log once it is final.
///
/// Implementations must not return `Ok` for a transaction that failed on chain.
#[async_trait]
pub trait Submitter: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, request: &CallRequest, signer: &Keypair) -> SubmitResult<ResultLog>;
}
