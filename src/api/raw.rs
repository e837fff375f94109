//! Raw wire shapes as the node returns them: every quantity is still a hex
//! string. The formatter registry turns these into the typed objects in the
//! sibling modules. Chain-specific extension fields live here as optionals;
//! only the matching overlay formatter reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: String,
    pub nonce: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    pub gas: String,
    pub input: String,
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default)]
    pub access_list: Option<Vec<RpcAccessListItem>>,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub r: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    // OP-Stack deposit transaction fields (type 0x7e)
    #[serde(default)]
    pub source_hash: Option<String>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub is_system_tx: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcAccessListItem {
    pub address: String,
    pub storage_keys: Vec<String>,
}

/// Either hashes or full objects, as requested; a node never mixes the two
/// within one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBlockTransactions {
    Hashes(Vec<String>),
    Full(Vec<RpcTransaction>),
}

impl Default for RawBlockTransactions {
    fn default() -> Self {
        Self::Hashes(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    // Pending blocks carry null hash/number/nonce
    #[serde(default)]
    pub hash: Option<String>,
    pub parent_hash: String,
    #[serde(default)]
    pub number: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub nonce: Option<String>,
    pub miner: String,
    pub gas_limit: String,
    pub gas_used: String,
    #[serde(default)]
    pub base_fee_per_gas: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub total_difficulty: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub state_root: String,
    pub receipts_root: String,
    pub transactions_root: String,
    #[serde(default)]
    pub logs_bloom: Option<String>,
    #[serde(default)]
    pub extra_data: Option<String>,
    #[serde(default)]
    pub mix_hash: Option<String>,
    #[serde(default)]
    pub uncles: Vec<String>,
    #[serde(default)]
    pub transactions: RawBlockTransactions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_hash: String,
    pub block_number: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    pub cumulative_gas_used: String,
    pub gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
    #[serde(default)]
    pub logs_bloom: Option<String>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    // OP-Stack L1 fee fields; l1FeeScalar is a decimal string on the wire
    #[serde(default)]
    pub l1_fee: Option<String>,
    #[serde(default)]
    pub l1_gas_price: Option<String>,
    #[serde(default)]
    pub l1_gas_used: Option<String>,
    #[serde(default)]
    pub l1_fee_scalar: Option<String>,
}
