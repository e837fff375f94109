//! Typed JSON-RPC client for Ethereum-compatible nodes.
//!
//! The node speaks a heterogeneous, per-chain wire protocol; this crate puts
//! a stable, strongly-typed surface over it. Two subsystems do the work:
//!
//! - the chain-keyed [`formatter`] registry turns raw hex payloads into
//!   typed blocks, transactions and receipts, including chain-specific
//!   supersets of the base schema (OP-Stack deposit transactions, L1-fee
//!   receipts) without disturbing base-chain behavior;
//! - the [`rpc::transport`] layer runs the calls over HTTP, WebSocket or a
//!   local stream socket, with retry for idempotent reads, request batching
//!   and connection-lifecycle handling.
//!
//! A [`Client`] binds one [`ChainDefinition`], one transport and the enabled
//! action namespaces into a single callable surface:
//!
//! ```no_run
//! use evm_rpc_client::{ChainDefinition, Client};
//! use evm_rpc_client::rpc::transport::HttpTransport;
//!
//! # async fn run() -> Result<(), evm_rpc_client::ClientError> {
//! let client = Client::builder()
//!     .chain(ChainDefinition::mainnet())
//!     .transport(HttpTransport::new("https://eth.example.org")?)
//!     .build()?;
//! let balance = client
//!     .get_balance(&"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse()?, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod actions;
pub mod api;
pub mod chain;
pub mod client;
pub mod crypto;
pub mod error;
pub mod formatter;
pub mod rpc;
pub mod utils;

pub use chain::{ChainDefinition, NativeCurrency};
pub use client::{Client, ClientBuilder, TestNodeMode};
pub use crypto::{Address, Hash};
pub use error::{ClientError, CodecError, NetworkError, RpcError, ValidationError};
pub use primitive_types::U256;
