use std::sync::Arc;

use log::trace;
use serde_json::Value;

use crate::{
    chain::ChainDefinition,
    error::{ClientError, ValidationError},
    formatter::{Formatter, FormatterRegistry, ResolvedFormatters},
    rpc::transport::Transport,
};

/// Which development node flavor the test namespace talks to; it decides the
/// method prefix (`anvil_setBalance` vs `hardhat_setBalance`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestNodeMode {
    Anvil,
    Hardhat,
}

impl TestNodeMode {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Anvil => "anvil",
            Self::Hardhat => "hardhat",
        }
    }
}

/// Composition root: one chain, one transport, the formatters resolved for
/// that chain, and the enabled action namespaces. Everything inside is
/// immutable and behind `Arc`s, so cloning is cheap and concurrent calls
/// need no synchronization.
#[derive(Clone)]
pub struct Client {
    chain: Arc<ChainDefinition>,
    transport: Arc<dyn Transport>,
    formatters: ResolvedFormatters,
    test_mode: Option<TestNodeMode>,
}

pub struct ClientBuilder {
    chain: Option<ChainDefinition>,
    transport: Option<Arc<dyn Transport>>,
    test_mode: Option<TestNodeMode>,
    extra_formatters: Vec<(u64, Formatter)>,
}

impl ClientBuilder {
    pub fn chain(mut self, chain: ChainDefinition) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Share an already-constructed transport between clients.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable the test namespace (setBalance and friends).
    pub fn test_actions(mut self, mode: TestNodeMode) -> Self {
        self.test_mode = Some(mode);
        self
    }

    /// Register an additional formatter overlay beyond what the chain
    /// definition carries.
    pub fn formatter(mut self, chain_id: u64, formatter: Formatter) -> Self {
        self.extra_formatters.push((chain_id, formatter));
        self
    }

    /// Resolve formatters and bind everything together. No connectivity
    /// probe happens here: a bad transport surfaces on first use.
    pub fn build(self) -> Result<Client, ClientError> {
        let chain = self
            .chain
            .ok_or(ValidationError::Config("a chain definition is required"))?;
        let transport = self
            .transport
            .ok_or(ValidationError::Config("a transport is required"))?;

        let mut registry = FormatterRegistry::new();
        registry.register_overlay(chain.id, &chain.formatters);
        for (chain_id, formatter) in self.extra_formatters {
            registry.register(chain_id, formatter);
        }
        let formatters = registry.resolve(chain.id);

        Ok(Client {
            chain: Arc::new(chain),
            transport,
            formatters,
            test_mode: self.test_mode,
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder {
            chain: None,
            transport: None,
            test_mode: None,
            extra_formatters: Vec::new(),
        }
    }

    pub fn chain(&self) -> &ChainDefinition {
        &self.chain
    }

    /// Native currency precision of the bound chain.
    pub fn decimals(&self) -> u8 {
        self.chain.native_currency.decimals
    }

    pub(crate) fn formatters(&self) -> &ResolvedFormatters {
        &self.formatters
    }

    pub(crate) fn test_mode(&self) -> Option<TestNodeMode> {
        self.test_mode
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Raw escape hatch used by every action.
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        trace!("call_raw '{}'", method);
        self.transport.request(method, params).await
    }
}
