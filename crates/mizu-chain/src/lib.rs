//! mizu-chain - Ledger submission: typed call requests, signing, Sui JSON-RPC

pub mod call;
pub mod keypair;
pub mod mock;
pub mod rpc;
pub mod submitter;
pub mod sui;

pub use call::{CallArg, CallRequest, FunctionSig, MoveCall, Param, PayloadError};
pub use keypair::{CredentialError, Keypair};
pub use mock::{MockBehavior, MockSubmitter};
pub use submitter::{SubmitError, SubmitResult, Submitter};
pub use sui::SuiClient;
