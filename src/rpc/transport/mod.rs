mod http;
#[cfg(unix)]
mod ipc;
mod ws;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use serde_json::Value;

use crate::{error::ClientError, rpc::is_idempotent};

pub use http::{BatchConfig, HttpTransport};
#[cfg(unix)]
pub use ipc::IpcTransport;
pub use ws::{ConnectionState, ReconnectPolicy, WebSocketTransport};

/// Executes one JSON-RPC call over a concrete protocol.
///
/// Implementations must be safe for arbitrarily many concurrent invocations
/// on a shared instance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `(method, params)` and return the raw `result` value. A node
    /// error object becomes `ClientError::Rpc`, a connection failure
    /// `ClientError::Network`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError>;

    /// Transports pointed at production nodes refuse test-namespace methods
    /// before they hit the wire.
    fn is_production(&self) -> bool {
        false
    }
}

/// Retry configuration for idempotent reads: exponential backoff with
/// uniform jitter, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(150),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let capped = exponential.min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0..=capped.as_millis() as u64 / 2);
        capped + Duration::from_millis(jitter)
    }
}

/// Shared retry loop. Mutating methods get exactly one attempt regardless of
/// the policy; idempotent reads are re-issued on connection-level failures
/// until the policy is exhausted.
pub(crate) async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    method: &str,
    issue: F,
) -> Result<Value, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Value, ClientError>>,
{
    let retries = if is_idempotent(method) {
        policy.max_retries
    } else {
        0
    };

    let mut attempt = 0;
    loop {
        match issue().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "'{}' failed ({}), retry {}/{} in {:?}",
                    method,
                    err,
                    attempt + 1,
                    retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!("'{}' failed: {}", method, err);
                return Err(err);
            }
        }
    }
}
