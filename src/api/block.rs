use primitive_types::U256;

use super::Transaction;
use crate::crypto::{Address, Hash};

/// Transactions of a block, shaped by the request-time flag: hashes when
/// full objects were not requested, fully formatted transactions otherwise.
/// Order always matches the node's returned order.
#[derive(Debug, Clone)]
pub enum BlockTransactions {
    Hashes(Vec<Hash>),
    Full(Vec<Transaction>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            Self::Hashes(hashes) => hashes.len(),
            Self::Full(transactions) => transactions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transaction hashes in block order, whatever the shape.
    pub fn hashes(&self) -> Vec<Hash> {
        match self {
            Self::Hashes(hashes) => hashes.clone(),
            Self::Full(transactions) => transactions.iter().map(|tx| tx.hash()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    /// None for the pending block.
    pub hash: Option<Hash>,
    pub parent_hash: Hash,
    pub number: Option<u64>,
    pub timestamp: u64,
    pub nonce: Option<u64>,
    pub miner: Address,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub base_fee_per_gas: Option<U256>,
    /// None when the node reports no difficulty at all; post-merge chains
    /// report an explicit zero instead.
    pub difficulty: Option<U256>,
    pub total_difficulty: Option<U256>,
    pub size: Option<u64>,
    pub state_root: Hash,
    pub receipts_root: Hash,
    pub transactions_root: Hash,
    pub extra_data: Option<String>,
    pub uncles: Vec<Hash>,
    pub transactions: BlockTransactions,
}
