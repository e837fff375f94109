use std::sync::Arc;

use crate::formatter::{
    Formatter, FormatterOverlay, OpStackReceiptFormatter, OpStackTransactionFormatter,
};

#[derive(Debug, Clone)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn ether() -> Self {
        Self {
            name: "Ether".to_owned(),
            symbol: "ETH".to_owned(),
            decimals: 18,
        }
    }
}

/// Immutable descriptor of one network: its id, native currency precision
/// and the formatter overlay applied on top of the protocol defaults.
/// Built once at configuration time and shared read-only afterwards.
#[derive(Clone)]
pub struct ChainDefinition {
    pub id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub formatters: FormatterOverlay,
}

impl ChainDefinition {
    pub fn new(id: u64, name: &str, native_currency: NativeCurrency) -> Self {
        Self {
            id,
            name: name.to_owned(),
            native_currency,
            formatters: FormatterOverlay::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatters.insert(formatter);
        self
    }

    pub fn mainnet() -> Self {
        Self::new(1, "Ethereum", NativeCurrency::ether())
    }

    /// OP Mainnet: base schema plus deposit transactions and L1 fee
    /// receipts.
    pub fn op_mainnet() -> Self {
        Self::new(10, "OP Mainnet", NativeCurrency::ether())
            .with_formatter(Formatter::Transaction(Arc::new(OpStackTransactionFormatter)))
            .with_formatter(Formatter::TransactionReceipt(Arc::new(
                OpStackReceiptFormatter,
            )))
    }

    /// Local development node (anvil/hardhat default chain id).
    pub fn dev() -> Self {
        Self::new(31337, "Localhost", NativeCurrency::ether())
    }
}
