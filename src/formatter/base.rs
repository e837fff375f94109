//! Protocol-default decode rules. Raw hex never survives into a typed
//! object: every quantity is decoded or the call fails, and an absent
//! optional field stays `None` rather than collapsing to zero.

use primitive_types::U256;
use serde_json::Value;

use super::{BlockFormatter, ReceiptFormatter, RequestFormatter, TransactionFormatter};
use crate::{
    api::{
        AccessListItem, Block, BlockTransactions, Eip1559Transaction, Eip2930Transaction,
        LegacyTransaction, Log, RawBlockTransactions, RpcAccessListItem, RpcBlock, RpcLog,
        RpcTransaction, RpcTransactionReceipt, Transaction, TransactionBase, TransactionReceipt,
        TransactionRequest, UnknownTransaction,
    },
    crypto::{Address, Hash},
    error::{ClientError, CodecError},
    utils::{canonicalize_hex, hex_to_bool, hex_to_u256, hex_to_u64, u256_to_hex, u64_to_hex},
};

pub(super) fn require<'a>(
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, CodecError> {
    value
        .as_deref()
        .ok_or(CodecError::MissingField(field))
}

pub(super) fn parse_address(value: &str) -> Result<Address, ClientError> {
    Ok(value.parse::<Address>()?)
}

pub(super) fn parse_hash(value: &str) -> Result<Hash, ClientError> {
    Ok(value.parse::<Hash>()?)
}

fn opt_u64(value: &Option<String>) -> Result<Option<u64>, CodecError> {
    value.as_deref().map(hex_to_u64).transpose()
}

fn opt_u256(value: &Option<String>) -> Result<Option<U256>, CodecError> {
    value.as_deref().map(hex_to_u256).transpose()
}

fn opt_hash(value: &Option<String>) -> Result<Option<Hash>, ClientError> {
    value.as_deref().map(parse_hash).transpose()
}

fn opt_address(value: &Option<String>) -> Result<Option<Address>, ClientError> {
    value.as_deref().map(parse_address).transpose()
}

/// The raw `type` field; absent means a pre-envelope legacy transaction.
pub(super) fn transaction_type(raw: &RpcTransaction) -> Result<u8, CodecError> {
    match raw.tx_type.as_deref() {
        None => Ok(0),
        Some(t) => {
            let value = hex_to_u64(t)?;
            u8::try_from(value).map_err(|_| CodecError::Overflow(t.to_owned()))
        }
    }
}

pub(super) fn decode_base(raw: &RpcTransaction) -> Result<TransactionBase, ClientError> {
    Ok(TransactionBase {
        hash: parse_hash(&raw.hash)?,
        nonce: hex_to_u64(&raw.nonce)?,
        block_hash: opt_hash(&raw.block_hash)?,
        block_number: opt_u64(&raw.block_number)?,
        transaction_index: opt_u64(&raw.transaction_index)?,
        from: parse_address(&raw.from)?,
        to: opt_address(&raw.to)?,
        value: hex_to_u256(&raw.value)?,
        gas: hex_to_u256(&raw.gas)?,
        input: canonicalize_hex(&raw.input)?,
    })
}

fn decode_access_list(
    raw: &Option<Vec<RpcAccessListItem>>,
) -> Result<Vec<AccessListItem>, ClientError> {
    raw.as_deref()
        .unwrap_or_default()
        .iter()
        .map(|item| {
            Ok(AccessListItem {
                address: parse_address(&item.address)?,
                storage_keys: item
                    .storage_keys
                    .iter()
                    .map(|key| parse_hash(key))
                    .collect::<Result<Vec<Hash>, ClientError>>()?,
            })
        })
        .collect()
}

/// Base decode dispatch on the transaction discriminant. Recognized types
/// get their declared fields; anything else decodes to the generic shape so
/// a newer chain never breaks an older client.
pub struct BaseTransactionFormatter;

impl TransactionFormatter for BaseTransactionFormatter {
    fn format(&self, raw: RpcTransaction) -> Result<Transaction, ClientError> {
        let tx_type = transaction_type(&raw)?;
        let base = decode_base(&raw)?;
        match tx_type {
            0 => Ok(Transaction::Legacy(LegacyTransaction {
                base,
                gas_price: hex_to_u256(require("gasPrice", &raw.gas_price)?)?,
                chain_id: opt_u64(&raw.chain_id)?,
            })),
            1 => Ok(Transaction::Eip2930(Eip2930Transaction {
                base,
                gas_price: hex_to_u256(require("gasPrice", &raw.gas_price)?)?,
                access_list: decode_access_list(&raw.access_list)?,
                chain_id: hex_to_u64(require("chainId", &raw.chain_id)?)?,
            })),
            2 => Ok(Transaction::Eip1559(Eip1559Transaction {
                base,
                max_fee_per_gas: hex_to_u256(require("maxFeePerGas", &raw.max_fee_per_gas)?)?,
                max_priority_fee_per_gas: hex_to_u256(require(
                    "maxPriorityFeePerGas",
                    &raw.max_priority_fee_per_gas,
                )?)?,
                access_list: decode_access_list(&raw.access_list)?,
                chain_id: hex_to_u64(require("chainId", &raw.chain_id)?)?,
            })),
            other => Ok(Transaction::Other(UnknownTransaction {
                base,
                tx_type: other,
            })),
        }
    }
}

pub struct BaseBlockFormatter;

impl BlockFormatter for BaseBlockFormatter {
    fn format(
        &self,
        raw: RpcBlock,
        transactions: &dyn TransactionFormatter,
    ) -> Result<Block, ClientError> {
        let txs = match raw.transactions {
            RawBlockTransactions::Hashes(hashes) => BlockTransactions::Hashes(
                hashes
                    .iter()
                    .map(|h| parse_hash(h))
                    .collect::<Result<Vec<Hash>, ClientError>>()?,
            ),
            RawBlockTransactions::Full(raw_txs) => BlockTransactions::Full(
                raw_txs
                    .into_iter()
                    .map(|tx| transactions.format(tx))
                    .collect::<Result<Vec<Transaction>, ClientError>>()?,
            ),
        };

        Ok(Block {
            hash: opt_hash(&raw.hash)?,
            parent_hash: parse_hash(&raw.parent_hash)?,
            number: opt_u64(&raw.number)?,
            timestamp: hex_to_u64(&raw.timestamp)?,
            nonce: opt_u64(&raw.nonce)?,
            miner: parse_address(&raw.miner)?,
            gas_limit: hex_to_u256(&raw.gas_limit)?,
            gas_used: hex_to_u256(&raw.gas_used)?,
            base_fee_per_gas: opt_u256(&raw.base_fee_per_gas)?,
            difficulty: opt_u256(&raw.difficulty)?,
            total_difficulty: opt_u256(&raw.total_difficulty)?,
            size: opt_u64(&raw.size)?,
            state_root: parse_hash(&raw.state_root)?,
            receipts_root: parse_hash(&raw.receipts_root)?,
            transactions_root: parse_hash(&raw.transactions_root)?,
            extra_data: raw
                .extra_data
                .as_deref()
                .map(canonicalize_hex)
                .transpose()?,
            uncles: raw
                .uncles
                .iter()
                .map(|h| parse_hash(h))
                .collect::<Result<Vec<Hash>, ClientError>>()?,
            transactions: txs,
        })
    }
}

fn decode_log(raw: &RpcLog) -> Result<Log, ClientError> {
    Ok(Log {
        address: parse_address(&raw.address)?,
        topics: raw
            .topics
            .iter()
            .map(|t| parse_hash(t))
            .collect::<Result<Vec<Hash>, ClientError>>()?,
        data: canonicalize_hex(&raw.data)?,
        block_number: opt_u64(&raw.block_number)?,
        block_hash: opt_hash(&raw.block_hash)?,
        transaction_hash: opt_hash(&raw.transaction_hash)?,
        transaction_index: opt_u64(&raw.transaction_index)?,
        log_index: opt_u64(&raw.log_index)?,
        removed: raw.removed,
    })
}

pub struct BaseReceiptFormatter;

impl ReceiptFormatter for BaseReceiptFormatter {
    fn format(&self, raw: RpcTransactionReceipt) -> Result<TransactionReceipt, ClientError> {
        let tx_type = match raw.tx_type.as_deref() {
            None => 0,
            Some(t) => u8::try_from(hex_to_u64(t)?)
                .map_err(|_| CodecError::Overflow(t.to_owned()))?,
        };
        Ok(TransactionReceipt {
            transaction_hash: parse_hash(&raw.transaction_hash)?,
            transaction_index: hex_to_u64(&raw.transaction_index)?,
            block_hash: parse_hash(&raw.block_hash)?,
            block_number: hex_to_u64(&raw.block_number)?,
            from: parse_address(&raw.from)?,
            to: opt_address(&raw.to)?,
            contract_address: opt_address(&raw.contract_address)?,
            cumulative_gas_used: hex_to_u256(&raw.cumulative_gas_used)?,
            gas_used: hex_to_u256(&raw.gas_used)?,
            effective_gas_price: opt_u256(&raw.effective_gas_price)?,
            status: raw.status.as_deref().map(hex_to_bool).transpose()?,
            tx_type,
            logs: raw
                .logs
                .iter()
                .map(decode_log)
                .collect::<Result<Vec<Log>, ClientError>>()?,
            l1: None,
        })
    }
}

/// Encode direction for request-building kinds: typed fields to the raw hex
/// object `eth_call` and friends expect. Only present fields are emitted.
pub struct BaseRequestFormatter;

impl RequestFormatter for BaseRequestFormatter {
    fn encode(&self, request: &TransactionRequest) -> Result<Value, ClientError> {
        let mut object = serde_json::Map::new();
        if let Some(from) = &request.from {
            object.insert("from".to_owned(), Value::String(from.to_hex()));
        }
        if let Some(to) = &request.to {
            object.insert("to".to_owned(), Value::String(to.to_hex()));
        }
        if let Some(gas) = request.gas {
            object.insert("gas".to_owned(), Value::String(u256_to_hex(gas)));
        }
        if let Some(gas_price) = request.gas_price {
            object.insert("gasPrice".to_owned(), Value::String(u256_to_hex(gas_price)));
        }
        if let Some(max_fee) = request.max_fee_per_gas {
            object.insert("maxFeePerGas".to_owned(), Value::String(u256_to_hex(max_fee)));
        }
        if let Some(max_priority) = request.max_priority_fee_per_gas {
            object.insert(
                "maxPriorityFeePerGas".to_owned(),
                Value::String(u256_to_hex(max_priority)),
            );
        }
        if let Some(value) = request.value {
            object.insert("value".to_owned(), Value::String(u256_to_hex(value)));
        }
        if let Some(data) = &request.data {
            object.insert("data".to_owned(), Value::String(canonicalize_hex(data)?));
        }
        if let Some(nonce) = request.nonce {
            object.insert("nonce".to_owned(), Value::String(u64_to_hex(nonce)));
        }
        if let Some(access_list) = &request.access_list {
            let encoded = serde_json::to_value(access_list).map_err(|e| ClientError::Decode {
                method: "request_formatter".to_owned(),
                source: e,
            })?;
            object.insert("accessList".to_owned(), encoded);
        }
        Ok(Value::Object(object))
    }
}
