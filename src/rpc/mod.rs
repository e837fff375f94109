pub mod transport;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

pub const JSON_RPC_VERSION: &str = "2.0";

/// Request/response correlation id. Nodes echo back whatever shape was sent;
/// this library always sends numbers but accepts both on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: Id,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            id: Id::Number(id),
            method: method.to_owned(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// A `null` result is a legitimate success (hash lookups that miss);
    /// callers that require a value map it to NotFound themselves.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// Explicit idempotency classification: only methods in this table may be
/// retried after a connection-level failure. State-mutating calls (sends,
/// test-node overrides) are never retried automatically.
pub fn is_idempotent(method: &str) -> bool {
    matches!(
        method,
        "eth_blockNumber"
            | "eth_chainId"
            | "eth_gasPrice"
            | "eth_maxPriorityFeePerGas"
            | "eth_getBalance"
            | "eth_getCode"
            | "eth_getStorageAt"
            | "eth_getTransactionCount"
            | "eth_getBlockByHash"
            | "eth_getBlockByNumber"
            | "eth_getBlockTransactionCountByHash"
            | "eth_getBlockTransactionCountByNumber"
            | "eth_getTransactionByHash"
            | "eth_getTransactionByBlockHashAndIndex"
            | "eth_getTransactionByBlockNumberAndIndex"
            | "eth_getTransactionReceipt"
            | "eth_getLogs"
            | "eth_call"
            | "eth_estimateGas"
            | "net_version"
            | "web3_clientVersion"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = RpcRequest::new(7, "eth_getBalance", json!(["0xabc", "latest"]));
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "eth_getBalance",
                "params": ["0xabc", "latest"],
            })
        );
    }

    #[test]
    fn test_success_response() {
        let response: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1b4"})).unwrap();
        assert_eq!(response.into_result().unwrap(), json!("0x1b4"));
    }

    #[test]
    fn test_null_result_is_success() {
        let response: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert!(response.into_result().unwrap().is_null());
    }

    #[test]
    fn test_error_response() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "method not found"},
        }))
        .unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, -32601);
    }

    #[test]
    fn test_idempotency_classification() {
        assert!(is_idempotent("eth_getBalance"));
        assert!(is_idempotent("eth_getBlockByNumber"));
        assert!(!is_idempotent("eth_sendRawTransaction"));
        assert!(!is_idempotent("anvil_setBalance"));
        assert!(!is_idempotent("evm_mine"));
    }
}
