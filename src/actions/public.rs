//! Read-only actions available on every node.

use log::trace;
use primitive_types::U256;
use serde_json::{json, Value};

use crate::{
    api::{
        Block, BlockSelector, RpcBlock, RpcTransaction, RpcTransactionReceipt, Transaction,
        TransactionReceipt, TransactionRequest, TransactionSelector,
    },
    client::Client,
    crypto::{Address, Hash},
    error::{ClientError, CodecError},
    utils::{canonicalize_hex, hex_to_u256, hex_to_u64, u64_to_hex},
};

/// Results of quantity-returning calls are hex strings; anything else is a
/// malformed node response.
fn expect_hex_result(method: &str, result: &Value) -> Result<String, ClientError> {
    result
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| {
            ClientError::Codec(CodecError::UnexpectedShape {
                field: "result",
                detail: format!("'{}' returned a non-string result", method),
            })
        })
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, result: Value) -> Result<T, ClientError> {
    serde_json::from_value(result).map_err(|e| ClientError::Decode {
        method: method.to_owned(),
        source: e,
    })
}

impl Client {
    /// Account balance in base units at the selected block (latest when no
    /// selector is given).
    pub async fn get_balance(
        &self,
        address: &Address,
        selector: Option<BlockSelector>,
    ) -> Result<U256, ClientError> {
        trace!("get_balance {}", address);
        let selector = selector.unwrap_or_default();
        let result = self
            .call_raw(
                "eth_getBalance",
                json!([address.to_hex(), selector.to_param()]),
            )
            .await?;
        Ok(hex_to_u256(&expect_hex_result("eth_getBalance", &result)?)?)
    }

    /// Fetch a block. With `include_transactions` the result carries fully
    /// formatted transactions, otherwise just their hashes; the node decides
    /// the content, this flag only selects the shape.
    pub async fn get_block(
        &self,
        selector: BlockSelector,
        include_transactions: bool,
    ) -> Result<Block, ClientError> {
        trace!("get_block {:?}", selector);
        let (method, params) = match selector {
            BlockSelector::Hash(hash) => (
                "eth_getBlockByHash",
                json!([hash.to_hex(), include_transactions]),
            ),
            BlockSelector::Number(number) => (
                "eth_getBlockByNumber",
                json!([u64_to_hex(number), include_transactions]),
            ),
            BlockSelector::Tag(tag) => (
                "eth_getBlockByNumber",
                json!([tag.as_str(), include_transactions]),
            ),
        };
        let result = self.call_raw(method, params).await?;
        if result.is_null() {
            return Err(ClientError::not_found("block"));
        }
        let raw: RpcBlock = decode(method, result)?;
        let formatters = self.formatters();
        formatters.block.format(raw, formatters.transaction.as_ref())
    }

    /// Fetch a transaction by hash or by (block, index).
    pub async fn get_transaction(
        &self,
        selector: TransactionSelector,
    ) -> Result<Transaction, ClientError> {
        trace!("get_transaction {:?}", selector);
        let (method, params) = match selector {
            TransactionSelector::Hash(hash) => {
                ("eth_getTransactionByHash", json!([hash.to_hex()]))
            }
            TransactionSelector::BlockAndIndex { block, index } => match block {
                BlockSelector::Hash(hash) => (
                    "eth_getTransactionByBlockHashAndIndex",
                    json!([hash.to_hex(), u64_to_hex(index)]),
                ),
                BlockSelector::Number(number) => (
                    "eth_getTransactionByBlockNumberAndIndex",
                    json!([u64_to_hex(number), u64_to_hex(index)]),
                ),
                BlockSelector::Tag(tag) => (
                    "eth_getTransactionByBlockNumberAndIndex",
                    json!([tag.as_str(), u64_to_hex(index)]),
                ),
            },
        };
        let result = self.call_raw(method, params).await?;
        if result.is_null() {
            return Err(ClientError::not_found("transaction"));
        }
        let raw: RpcTransaction = decode(method, result)?;
        self.formatters().transaction.format(raw)
    }

    pub async fn get_transaction_receipt(
        &self,
        hash: &Hash,
    ) -> Result<TransactionReceipt, ClientError> {
        trace!("get_transaction_receipt {}", hash);
        let result = self
            .call_raw("eth_getTransactionReceipt", json!([hash.to_hex()]))
            .await?;
        if result.is_null() {
            return Err(ClientError::not_found("transaction receipt"));
        }
        let raw: RpcTransactionReceipt = decode("eth_getTransactionReceipt", result)?;
        self.formatters().receipt.format(raw)
    }

    pub async fn get_block_number(&self) -> Result<u64, ClientError> {
        trace!("get_block_number");
        let result = self.call_raw("eth_blockNumber", json!([])).await?;
        Ok(hex_to_u64(&expect_hex_result("eth_blockNumber", &result)?)?)
    }

    pub async fn get_chain_id(&self) -> Result<u64, ClientError> {
        trace!("get_chain_id");
        let result = self.call_raw("eth_chainId", json!([])).await?;
        Ok(hex_to_u64(&expect_hex_result("eth_chainId", &result)?)?)
    }

    pub async fn get_gas_price(&self) -> Result<U256, ClientError> {
        trace!("get_gas_price");
        let result = self.call_raw("eth_gasPrice", json!([])).await?;
        Ok(hex_to_u256(&expect_hex_result("eth_gasPrice", &result)?)?)
    }

    /// Transaction count (nonce) of an account at the selected block.
    pub async fn get_transaction_count(
        &self,
        address: &Address,
        selector: Option<BlockSelector>,
    ) -> Result<u64, ClientError> {
        trace!("get_transaction_count {}", address);
        let selector = selector.unwrap_or_default();
        let result = self
            .call_raw(
                "eth_getTransactionCount",
                json!([address.to_hex(), selector.to_param()]),
            )
            .await?;
        Ok(hex_to_u64(&expect_hex_result(
            "eth_getTransactionCount",
            &result,
        )?)?)
    }

    /// Deployed bytecode at an address, canonical hex (`0x` when empty).
    pub async fn get_code(
        &self,
        address: &Address,
        selector: Option<BlockSelector>,
    ) -> Result<String, ClientError> {
        trace!("get_code {}", address);
        let selector = selector.unwrap_or_default();
        let result = self
            .call_raw("eth_getCode", json!([address.to_hex(), selector.to_param()]))
            .await?;
        Ok(canonicalize_hex(&expect_hex_result("eth_getCode", &result)?)?)
    }

    /// Execute a read-only call. The request goes through the chain's
    /// request formatter (encode direction); the returned data is canonical
    /// hex.
    pub async fn call(
        &self,
        request: &TransactionRequest,
        selector: Option<BlockSelector>,
    ) -> Result<String, ClientError> {
        trace!("call");
        let encoded = self.formatters().request.encode(request)?;
        let selector = selector.unwrap_or_default();
        let result = self
            .call_raw("eth_call", json!([encoded, selector.to_param()]))
            .await?;
        Ok(canonicalize_hex(&expect_hex_result("eth_call", &result)?)?)
    }
}
