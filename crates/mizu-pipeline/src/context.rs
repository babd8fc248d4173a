//! Session context: who signs, and through what, for one run.

use mizu_chain::{Keypair, Submitter};
use std::sync::Arc;

/// Built once per run and handed to every stage. Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    actor: Arc<str>,
    submitter: Arc<dyn Submitter>,
    signer: Arc<Keypair>,
}

impl SessionContext {
    pub fn new(actor: &str, submitter: Arc<dyn Submitter>, signer: Arc<Keypair>) -> Self {
        Self {
            actor: Arc::from(actor),
            submitter,
            signer,
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Ledger address of the signer.
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn submitter(&self) -> &dyn Submitter {
        self.submitter.as_ref()
    }

    pub fn signer(&self) -> &Keypair {
        &self.signer
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("actor", &self.actor)
            .field("submitter", &self.submitter.name())
            .field("address", &self.address())
            .finish()
    }
}
