//! Sui JSON-RPC wire types and response decoding.

use crate::submitter::{SubmitError, SubmitResult};
use mizu_core::{ChangeRecord, ResultLog};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// 1 SUI = 10^9 MIST.
pub const MIST_PER_SUI: u64 = 1_000_000_000;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn into_result(self) -> SubmitResult<Value> {
        if let Some(err) = self.error {
            return Err(SubmitError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| SubmitError::InvalidResponse("neither result nor error".into()))
    }
}

/// Result of the `unsafe_*` transaction builders.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBytes {
    pub tx_bytes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPage {
    pub data: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub coin_object_id: String,
    pub balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<Effects>,
    #[serde(default)]
    pub object_changes: Option<Vec<ObjectChange>>,
    #[serde(default)]
    pub balance_changes: Option<Vec<BalanceChange>>,
}

#[derive(Debug, Deserialize)]
pub struct Effects {
    pub status: ExecutionStatus,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectChange {
    #[serde(rename_all = "camelCase")]
    Published { package_id: String },
    #[serde(rename_all = "camelCase")]
    Created {
        object_type: String,
        object_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Mutated {
        object_type: String,
        object_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Transferred {
        object_type: String,
        object_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Deleted {
        object_type: String,
        object_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Wrapped {
        object_type: String,
        object_id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub coin_type: String,
    pub amount: String,
}

impl TransactionBlockResponse {
    /// Net SUI change across the response, in MIST (negative means spent).
    pub fn sui_delta(&self) -> i128 {
        self.balance_changes
            .iter()
            .flatten()
            .filter(|c| c.coin_type == SUI_COIN_TYPE)
            .filter_map(|c| c.amount.parse::<i128>().ok())
            .sum()
    }

    /// Turn a final response into a change log. A failed execution status is a
    /// rejection; a response without object changes is a missing log.
    pub fn into_result_log(self) -> SubmitResult<ResultLog> {
        if let Some(effects) = &self.effects {
            if effects.status.status != "success" {
                return Err(SubmitError::Rejected(
                    effects
                        .status
                        .error
                        .clone()
                        .unwrap_or_else(|| effects.status.status.clone()),
                ));
            }
        }
        let changes = self.object_changes.ok_or(SubmitError::MissingLog)?;

        let mut log = ResultLog::builder().digest(self.digest);
        for change in changes {
            log = match change {
                ObjectChange::Published { package_id } => log.published(package_id),
                ObjectChange::Created {
                    object_type,
                    object_id,
                } => log.created(object_type, object_id),
                ObjectChange::Mutated { object_type, .. } => {
                    log.record(ChangeRecord::mutated(Some(object_type)))
                }
                ObjectChange::Transferred { object_type, .. }
                | ObjectChange::Deleted { object_type, .. }
                | ObjectChange::Wrapped { object_type, .. } => {
                    log.record(ChangeRecord::other(Some(object_type)))
                }
                ObjectChange::Unknown => log.record(ChangeRecord::other(None)),
            };
        }
        Ok(log.build())
    }
}

/// MIST rendered as SUI with nine decimals, e.g. `-0.004123880`.
pub fn format_sui(mist: i128) -> String {
    let sign = if mist < 0 { "-" } else { "" };
    let abs = mist.unsigned_abs();
    let per = MIST_PER_SUI as u128;
    format!("{}{}.{:09}", sign, abs / per, abs % per)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rpc_error_body_wins() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32602, "message": "Invalid params"}
        }))
        .unwrap();
        assert!(matches!(
            resp.into_result().unwrap_err(),
            SubmitError::Rpc { code: -32602, .. }
        ));
    }

    #[test]
    fn unknown_change_type_tolerated() {
        let change: ObjectChange =
            serde_json::from_value(json!({"type": "unwrappedThenDeleted", "objectId": "0x1"}))
                .unwrap();
        assert_eq!(change, ObjectChange::Unknown);
    }

    #[test]
    fn format_sui_renders_nine_decimals() {
        assert_eq!(format_sui(-4_123_880), "-0.004123880");
        assert_eq!(format_sui(1_500_000_000), "1.500000000");
        assert_eq!(format_sui(0), "0.000000000");
    }
}
