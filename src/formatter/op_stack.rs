//! OP-Stack overlay: deposit transactions (type 0x7e) and the L1 fee block
//! on receipts. Everything the overlay does not refine defers to the base
//! formatters, so base-chain behavior is untouched.

use super::{
    base::{decode_base, require, transaction_type},
    BaseReceiptFormatter, BaseTransactionFormatter, ReceiptFormatter, TransactionFormatter,
};
use crate::{
    api::{
        DepositTransaction, L1FeeReceipt, RpcTransaction, RpcTransactionReceipt, Transaction,
        TransactionReceipt,
    },
    error::{ClientError, CodecError},
    utils::hex_to_u256,
};

pub const DEPOSIT_TX_TYPE: u8 = 0x7e;

pub struct OpStackTransactionFormatter;

impl TransactionFormatter for OpStackTransactionFormatter {
    fn format(&self, raw: RpcTransaction) -> Result<Transaction, ClientError> {
        if transaction_type(&raw)? != DEPOSIT_TX_TYPE {
            return BaseTransactionFormatter.format(raw);
        }
        let base = decode_base(&raw)?;
        Ok(Transaction::Deposit(DepositTransaction {
            base,
            source_hash: require("sourceHash", &raw.source_hash)?.parse()?,
            // absent mint means "no mint", which is not the same as 0x0
            mint: raw.mint.as_deref().map(hex_to_u256).transpose()?,
            is_system_tx: raw.is_system_tx.unwrap_or(false),
        }))
    }
}

pub struct OpStackReceiptFormatter;

impl ReceiptFormatter for OpStackReceiptFormatter {
    fn format(&self, raw: RpcTransactionReceipt) -> Result<TransactionReceipt, ClientError> {
        let l1 = L1FeeReceipt {
            l1_fee: raw.l1_fee.as_deref().map(hex_to_u256).transpose()?,
            l1_gas_price: raw.l1_gas_price.as_deref().map(hex_to_u256).transpose()?,
            l1_gas_used: raw.l1_gas_used.as_deref().map(hex_to_u256).transpose()?,
            // decimal on the wire, unlike every other numeric field
            l1_fee_scalar: raw
                .l1_fee_scalar
                .as_deref()
                .map(|s| {
                    s.parse::<f64>()
                        .map_err(|_| CodecError::InvalidDecimal(s.to_owned()))
                })
                .transpose()?,
        };
        let mut receipt = BaseReceiptFormatter.format(raw)?;
        receipt.l1 = Some(l1);
        Ok(receipt)
    }
}
