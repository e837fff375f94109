use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::crypto::{Address, Hash};

/// Fields shared by every transaction variant, whatever its discriminant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBase {
    pub hash: Hash,
    pub nonce: u64,
    /// None while the transaction is still pending.
    pub block_hash: Option<Hash>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub from: Address,
    /// None for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub gas: U256,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub base: TransactionBase,
    pub gas_price: U256,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip2930Transaction {
    pub base: TransactionBase,
    pub gas_price: U256,
    pub access_list: Vec<AccessListItem>,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559Transaction {
    pub base: TransactionBase,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub access_list: Vec<AccessListItem>,
    pub chain_id: u64,
}

/// OP-Stack deposit transaction (discriminant 0x7e). The extension fields
/// exist only here: no other variant can carry them, even as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositTransaction {
    pub base: TransactionBase,
    pub source_hash: Hash,
    pub mint: Option<U256>,
    pub is_system_tx: bool,
}

/// Forward-compatibility shape for discriminants this build does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransaction {
    pub base: TransactionBase,
    pub tx_type: u8,
}

/// Tagged union over the transaction discriminant. Consumption sites match
/// exhaustively; there is no "is this field defined" checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Legacy(LegacyTransaction),
    Eip2930(Eip2930Transaction),
    Eip1559(Eip1559Transaction),
    Deposit(DepositTransaction),
    Other(UnknownTransaction),
}

impl Transaction {
    pub fn base(&self) -> &TransactionBase {
        match self {
            Self::Legacy(tx) => &tx.base,
            Self::Eip2930(tx) => &tx.base,
            Self::Eip1559(tx) => &tx.base,
            Self::Deposit(tx) => &tx.base,
            Self::Other(tx) => &tx.base,
        }
    }

    pub fn hash(&self) -> Hash {
        self.base().hash
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "legacy",
            Self::Eip2930(_) => "eip2930",
            Self::Eip1559(_) => "eip1559",
            Self::Deposit(_) => "deposit",
            Self::Other(_) => "unknown",
        }
    }
}

/// Outbound request shape used by read-only calls (`eth_call`). Encoded to
/// the wire by the chain's request formatter.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub value: Option<U256>,
    pub data: Option<String>,
    pub nonce: Option<u64>,
    pub access_list: Option<Vec<AccessListItem>>,
}
