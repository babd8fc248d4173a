//! Sui full-node submitter over JSON-RPC
//!
//! Transactions are built by the node (`unsafe_*` builders), signed locally and
//! executed with `WaitForLocalExecution`, so the returned change log is final.

use crate::call::{CallRequest, MoveCall};
use crate::keypair::Keypair;
use crate::rpc::{
    format_sui, CoinPage, RpcRequest, RpcResponse, TransactionBlockResponse, TransactionBytes,
    SUI_COIN_TYPE,
};
use crate::submitter::{SubmitError, SubmitResult, Submitter};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mizu_core::ResultLog;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

pub const TESTNET_URL: &str = "https://fullnode.testnet.sui.io:443";
pub const DEFAULT_GAS_BUDGET: u64 = 100_000_000;

pub struct SuiClient {
    client: Client,
    url: String,
    gas_budget: u64,
    next_id: AtomicU64,
}

impl SuiClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            gas_budget: DEFAULT_GAS_BUDGET,
            next_id: AtomicU64::new(1),
        }
    }

    /// Client whose every request gives up after `timeout`.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> SubmitResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            ..Self::new(url)
        })
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> SubmitResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("sui rpc #{} {}", id, method);

        let response = self
            .client
            .post(&self.url)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("sui rpc {} failed {}: {}", method, status, error_text);
            return Err(SubmitError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let body: RpcResponse = response.json().await?;
        let result = body.into_result()?;
        serde_json::from_value(result)
            .map_err(|e| SubmitError::InvalidResponse(format!("{}: {}", method, e)))
    }

    /// Owned SUI coin ids, largest balance first.
    pub async fn sui_coins(&self, owner: &str) -> SubmitResult<Vec<String>> {
        let page: CoinPage = self
            .call("suix_getCoins", json!([owner, SUI_COIN_TYPE, null, 50]))
            .await?;
        let mut coins: Vec<(u128, String)> = page
            .data
            .into_iter()
            .map(|c| (c.balance.parse().unwrap_or(0), c.coin_object_id))
            .collect();
        coins.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(coins.into_iter().map(|(_, id)| id).collect())
    }

    async fn build(&self, request: &CallRequest, sender: &str) -> SubmitResult<TransactionBytes> {
        let budget = self.gas_budget.to_string();
        match request {
            CallRequest::MoveCall(call) => {
                self.call(
                    "unsafe_moveCall",
                    json!([
                        sender,
                        call.package(),
                        call.module(),
                        call.function(),
                        call.type_arguments(),
                        call.arguments_json(),
                        null,
                        budget,
                        null
                    ]),
                )
                .await
            }
            CallRequest::Batch { calls } => {
                let params: Vec<Value> = calls.iter().map(batch_entry).collect();
                self.call(
                    "unsafe_batchTransaction",
                    json!([sender, params, null, budget, null]),
                )
                .await
            }
            CallRequest::Publish {
                modules,
                dependencies,
            } => {
                self.call(
                    "unsafe_publish",
                    json!([sender, modules, dependencies, null, budget]),
                )
                .await
            }
            CallRequest::PaySui { amounts, recipient } => {
                let coins = self.sui_coins(sender).await?;
                if coins.is_empty() {
                    return Err(SubmitError::RequestFailed(format!(
                        "{} owns no SUI coins",
                        sender
                    )));
                }
                let to = recipient.as_deref().unwrap_or(sender);
                let recipients: Vec<&str> = amounts.iter().map(|_| to).collect();
                let amounts: Vec<String> = amounts.iter().map(|a| a.to_string()).collect();
                self.call(
                    "unsafe_paySui",
                    json!([sender, coins, recipients, amounts, budget]),
                )
                .await
            }
        }
    }

    async fn execute(&self, tx_bytes: &str, signature: &str) -> SubmitResult<TransactionBlockResponse> {
        self.call(
            "sui_executeTransactionBlock",
            json!([
                tx_bytes,
                [signature],
                {"showEffects": true, "showObjectChanges": true, "showBalanceChanges": true},
                "WaitForLocalExecution"
            ]),
        )
        .await
    }
}

fn batch_entry(call: &MoveCall) -> Value {
    json!({
        "moveCallRequestParams": {
            "packageObjectId": call.package(),
            "module": call.module(),
            "function": call.function(),
            "typeArguments": call.type_arguments(),
            "arguments": call.arguments_json(),
        }
    })
}

#[async_trait::async_trait]
impl Submitter for SuiClient {
    fn name(&self) -> &str {
        "sui"
    }

    async fn submit(&self, request: &CallRequest, signer: &Keypair) -> SubmitResult<ResultLog> {
        let built = self.build(request, signer.address()).await?;
        let raw = STANDARD
            .decode(&built.tx_bytes)
            .map_err(|e| SubmitError::InvalidResponse(format!("txBytes: {}", e)))?;
        let signature = signer.sign_transaction(&raw);

        let response = self.execute(&built.tx_bytes, &signature).await?;
        let delta = response.sui_delta();
        let digest = response.digest.clone();
        let log = response.into_result_log()?;

        info!(
            digest = digest.as_str(),
            changes = log.len(),
            "{} executed, balance change {} SUI",
            request.describe(),
            format_sui(delta)
        );
        Ok(log)
    }
}
