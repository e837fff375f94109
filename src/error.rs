use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error object reported by the node inside a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

// -32601 is the reserved JSON-RPC code for an unknown method
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("hex value '{}' is missing the 0x prefix", _0)]
    MissingHexPrefix(String),
    #[error("invalid hex value '{}'", _0)]
    InvalidHex(String),
    #[error("hex value '{}' does not fit in the target integer", _0)]
    Overflow(String),
    #[error("'{}' is not a boolean quantity (expected 0x0 or 0x1)", _0)]
    InvalidBoolean(String),
    #[error("'{}' has more than {} fractional digits", value, decimals)]
    Precision { value: String, decimals: u8 },
    #[error("'{}' is not a decimal amount", _0)]
    InvalidDecimal(String),
    #[error("required field '{}' is missing from the node response", _0)]
    MissingField(&'static str),
    #[error("field '{}' has an unexpected shape: {}", field, detail)]
    UnexpectedShape {
        field: &'static str,
        detail: String,
    },
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid address '{}': {}", input, reason)]
    InvalidAddress { input: String, reason: String },
    #[error("address '{}' has a bad EIP-55 checksum", _0)]
    BadChecksum(String),
    #[error("invalid hash '{}': {}", input, reason)]
    InvalidHash { input: String, reason: String },
    #[error("invalid client configuration: {}", _0)]
    Config(&'static str),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite_wasm::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("response channel dropped before a reply arrived")]
    ResponseDropped,
    #[error("request timed out after {}ms", _0)]
    Timeout(u128),
    #[error("invalid frame received: {}", _0)]
    InvalidFrame(String),
    #[error("batch dispatch failed: {}", _0)]
    BatchFailed(String),
    #[error("no response for this request in the batch reply")]
    MissingBatchReply,
}

/// Library-wide error taxonomy. Every failing action yields one of these,
/// carrying the method name where the failure happened on the wire.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("node returned an error for '{}': {}", method, error)]
    Rpc { method: String, error: RpcError },
    #[error("network failure during '{}': {}", method, source)]
    Network {
        method: String,
        #[source]
        source: NetworkError,
    },
    #[error("{} not found", what)]
    NotFound { what: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("method '{}' is not supported by this transport or node", method)]
    UnsupportedOperation { method: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to decode the response of '{}': {}", method, source)]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn rpc(method: &str, error: RpcError) -> Self {
        Self::Rpc {
            method: method.to_owned(),
            error,
        }
    }

    pub fn network<E: Into<NetworkError>>(method: &str, source: E) -> Self {
        Self::Network {
            method: method.to_owned(),
            source: source.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound {
            what: what.to_owned(),
        }
    }

    pub fn unsupported(method: &str) -> Self {
        Self::UnsupportedOperation {
            method: method.to_owned(),
        }
    }

    /// Whether retrying the same call could succeed. Only connection-level
    /// failures qualify; node-reported errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
