use primitive_types::U256;

use crate::crypto::{Address, Hash};

#[derive(Debug, Clone)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<Hash>,
    pub transaction_hash: Option<Hash>,
    pub transaction_index: Option<u64>,
    pub log_index: Option<u64>,
    pub removed: bool,
}

/// L1 fee breakdown attached by OP-Stack chains. Each field is either the
/// decoded integer or None when the node did not report it (deposit
/// transactions carry no L1 fee); an unparsed hex string never survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct L1FeeReceipt {
    pub l1_fee: Option<U256>,
    pub l1_gas_price: Option<U256>,
    pub l1_gas_used: Option<U256>,
    pub l1_fee_scalar: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    pub transaction_index: u64,
    pub block_hash: Hash,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    /// Set when the transaction deployed a contract.
    pub contract_address: Option<Address>,
    pub cumulative_gas_used: U256,
    pub gas_used: U256,
    pub effective_gas_price: Option<U256>,
    /// None on pre-Byzantium receipts, which report a state root instead.
    pub status: Option<bool>,
    pub tx_type: u8,
    pub logs: Vec<Log>,
    /// Populated only by chains whose overlay declares the L1 fee fields.
    pub l1: Option<L1FeeReceipt>,
}
