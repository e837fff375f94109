mod block;
mod raw;
mod receipt;
mod transaction;

use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

use crate::crypto::Hash;

pub use block::*;
pub use raw::*;
pub use receipt::*;
pub use transaction::*;

/// Symbolic block references understood by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
    Safe,
    Finalized,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
            Self::Pending => "pending",
            Self::Safe => "safe",
            Self::Finalized => "finalized",
        }
    }
}

impl Display for BlockTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one way to point at a block. Being a sum type, "several selectors
/// at once" cannot be expressed; request building maps each variant to
/// exactly one RPC parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSelector {
    Hash(Hash),
    Number(u64),
    Tag(BlockTag),
}

impl BlockSelector {
    pub fn latest() -> Self {
        Self::Tag(BlockTag::Latest)
    }

    /// Positional parameter form: quantities and tags go as strings, hashes
    /// as an EIP-1898 object.
    pub fn to_param(&self) -> Value {
        match self {
            Self::Hash(hash) => json!({ "blockHash": hash.to_hex() }),
            Self::Number(number) => Value::String(crate::utils::u64_to_hex(*number)),
            Self::Tag(tag) => Value::String(tag.as_str().to_owned()),
        }
    }
}

impl Default for BlockSelector {
    fn default() -> Self {
        Self::latest()
    }
}

impl From<u64> for BlockSelector {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl From<BlockTag> for BlockSelector {
    fn from(tag: BlockTag) -> Self {
        Self::Tag(tag)
    }
}

impl From<Hash> for BlockSelector {
    fn from(hash: Hash) -> Self {
        Self::Hash(hash)
    }
}

/// Exactly one way to point at a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSelector {
    Hash(Hash),
    BlockAndIndex { block: BlockSelector, index: u64 },
}

impl From<Hash> for TransactionSelector {
    fn from(hash: Hash) -> Self {
        Self::Hash(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_params() {
        assert_eq!(BlockSelector::latest().to_param(), json!("latest"));
        assert_eq!(
            BlockSelector::Tag(BlockTag::Pending).to_param(),
            json!("pending")
        );
        assert_eq!(BlockSelector::Number(16628100).to_param(), json!("0xfdb984"));

        let hash: Hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
            .parse()
            .unwrap();
        assert_eq!(
            BlockSelector::Hash(hash).to_param(),
            json!({ "blockHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b" })
        );
    }
}
