//! Chain-aware formatter registry.
//!
//! A formatter turns a raw wire shape into its typed domain object (and, for
//! request kinds, the other way around). Chains install overlays per object
//! kind; resolution happens once at client construction and the resolved set
//! is immutable afterwards, so concurrent calls share it without locking.

mod base;
mod op_stack;

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::{
    api::{
        Block, RpcBlock, RpcTransaction, RpcTransactionReceipt, Transaction, TransactionReceipt,
        TransactionRequest,
    },
    error::ClientError,
};

pub use base::{
    BaseBlockFormatter, BaseReceiptFormatter, BaseRequestFormatter, BaseTransactionFormatter,
};
pub use op_stack::{OpStackReceiptFormatter, OpStackTransactionFormatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Block,
    Transaction,
    TransactionReceipt,
    TransactionRequest,
}

pub trait BlockFormatter: Send + Sync {
    /// Full transactions inside the block go through the chain's transaction
    /// formatter, so overlays compose without re-implementing block decode.
    fn format(
        &self,
        raw: RpcBlock,
        transactions: &dyn TransactionFormatter,
    ) -> Result<Block, ClientError>;
}

pub trait TransactionFormatter: Send + Sync {
    fn format(&self, raw: RpcTransaction) -> Result<Transaction, ClientError>;
}

pub trait ReceiptFormatter: Send + Sync {
    fn format(&self, raw: RpcTransactionReceipt) -> Result<TransactionReceipt, ClientError>;
}

pub trait RequestFormatter: Send + Sync {
    /// Encode direction: typed request fields to the raw hex wire object.
    fn encode(&self, request: &TransactionRequest) -> Result<Value, ClientError>;
}

/// A formatter for one object kind, ready to be registered.
#[derive(Clone)]
pub enum Formatter {
    Block(Arc<dyn BlockFormatter>),
    Transaction(Arc<dyn TransactionFormatter>),
    TransactionReceipt(Arc<dyn ReceiptFormatter>),
    TransactionRequest(Arc<dyn RequestFormatter>),
}

impl Formatter {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Block(_) => ObjectKind::Block,
            Self::Transaction(_) => ObjectKind::Transaction,
            Self::TransactionReceipt(_) => ObjectKind::TransactionReceipt,
            Self::TransactionRequest(_) => ObjectKind::TransactionRequest,
        }
    }
}

/// Per-chain overlay: only the kinds a chain refines are present, everything
/// else falls back to the base formatters. Overlays add or refine; they can
/// never remove a base kind.
#[derive(Clone, Default)]
pub struct FormatterOverlay {
    pub block: Option<Arc<dyn BlockFormatter>>,
    pub transaction: Option<Arc<dyn TransactionFormatter>>,
    pub receipt: Option<Arc<dyn ReceiptFormatter>>,
    pub request: Option<Arc<dyn RequestFormatter>>,
}

impl FormatterOverlay {
    pub fn insert(&mut self, formatter: Formatter) {
        match formatter {
            Formatter::Block(f) => self.block = Some(f),
            Formatter::Transaction(f) => self.transaction = Some(f),
            Formatter::TransactionReceipt(f) => self.receipt = Some(f),
            Formatter::TransactionRequest(f) => self.request = Some(f),
        }
    }

    pub fn with(mut self, formatter: Formatter) -> Self {
        self.insert(formatter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_none()
            && self.transaction.is_none()
            && self.receipt.is_none()
            && self.request.is_none()
    }
}

/// The effective formatter set for one chain. Every kind resolves; none can
/// be absent.
#[derive(Clone)]
pub struct ResolvedFormatters {
    pub block: Arc<dyn BlockFormatter>,
    pub transaction: Arc<dyn TransactionFormatter>,
    pub receipt: Arc<dyn ReceiptFormatter>,
    pub request: Arc<dyn RequestFormatter>,
}

impl ResolvedFormatters {
    pub fn base() -> Self {
        Self {
            block: Arc::new(BaseBlockFormatter),
            transaction: Arc::new(BaseTransactionFormatter),
            receipt: Arc::new(BaseReceiptFormatter),
            request: Arc::new(BaseRequestFormatter),
        }
    }
}

/// Chain-keyed registry. Mutable only while being configured; clients hold
/// the resolved, immutable result.
pub struct FormatterRegistry {
    base: ResolvedFormatters,
    overlays: HashMap<u64, FormatterOverlay>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self {
            base: ResolvedFormatters::base(),
            overlays: HashMap::new(),
        }
    }

    /// Install or replace the overlay formatter of one kind for one chain.
    pub fn register(&mut self, chain_id: u64, formatter: Formatter) {
        self.overlays
            .entry(chain_id)
            .or_default()
            .insert(formatter);
    }

    pub fn register_overlay(&mut self, chain_id: u64, overlay: &FormatterOverlay) {
        let entry = self.overlays.entry(chain_id).or_default();
        if let Some(f) = &overlay.block {
            entry.block = Some(f.clone());
        }
        if let Some(f) = &overlay.transaction {
            entry.transaction = Some(f.clone());
        }
        if let Some(f) = &overlay.receipt {
            entry.receipt = Some(f.clone());
        }
        if let Some(f) = &overlay.request {
            entry.request = Some(f.clone());
        }
    }

    /// Effective formatters for a chain: its overlay where present, the base
    /// set everywhere else. Never fails, never yields an absent kind.
    pub fn resolve(&self, chain_id: u64) -> ResolvedFormatters {
        let overlay = self.overlays.get(&chain_id);
        ResolvedFormatters {
            block: overlay
                .and_then(|o| o.block.clone())
                .unwrap_or_else(|| self.base.block.clone()),
            transaction: overlay
                .and_then(|o| o.transaction.clone())
                .unwrap_or_else(|| self.base.transaction.clone()),
            receipt: overlay
                .and_then(|o| o.receipt.clone())
                .unwrap_or_else(|| self.base.receipt.clone()),
            request: overlay
                .and_then(|o| o.request.clone())
                .unwrap_or_else(|| self.base.request.clone()),
        }
    }

    /// Single-kind resolution, mostly useful for diagnostics.
    pub fn resolve_kind(&self, chain_id: u64, kind: ObjectKind) -> Formatter {
        let resolved = self.resolve(chain_id);
        match kind {
            ObjectKind::Block => Formatter::Block(resolved.block),
            ObjectKind::Transaction => Formatter::Transaction(resolved.transaction),
            ObjectKind::TransactionReceipt => Formatter::TransactionReceipt(resolved.receipt),
            ObjectKind::TransactionRequest => Formatter::TransactionRequest(resolved.request),
        }
    }
}
