use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, trace};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::{with_retry, RetryPolicy, Transport};
use crate::{
    error::{ClientError, NetworkError},
    rpc::{is_idempotent, Id, RpcRequest, RpcResponse},
};

/// Bounded scheduling window for request coalescing. With a zero wait the
/// window is exactly one cooperative tick: everything already submitted to
/// the channel is drained, then the batch goes on the wire.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub wait: Duration,
    pub max_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wait: Duration::ZERO,
            max_size: 100,
        }
    }
}

struct BatchEntry {
    request: RpcRequest,
    respond: oneshot::Sender<Result<Value, ClientError>>,
}

/// JSON-RPC over HTTP POST. Stateless request/response: no connection
/// lifecycle to manage, retries are a simple re-issue.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    next_id: Arc<AtomicU64>,
    production: bool,
    batch: Option<mpsc::UnboundedSender<BatchEntry>>,
}

pub struct HttpTransportBuilder {
    url: String,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    batch: Option<BatchConfig>,
    production: bool,
}

impl HttpTransportBuilder {
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Coalesce concurrently issued requests into JSON-RPC batch calls.
    pub fn batch(mut self, config: BatchConfig) -> Self {
        self.batch = Some(config);
        self
    }

    /// Mark the endpoint as a production node: test-namespace methods are
    /// refused before dispatch.
    pub fn production(mut self) -> Self {
        self.production = true;
        self
    }

    /// Must be called within a tokio runtime when batching is enabled (the
    /// batch dispatcher is a spawned task).
    pub fn build(self) -> Result<HttpTransport, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::network("http", e))?;

        let batch = self.batch.map(|config| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_batch_loop(
                client.clone(),
                self.url.clone(),
                self.retry.clone(),
                config,
                rx,
            ));
            tx
        });

        Ok(HttpTransport {
            client,
            url: self.url,
            retry: self.retry,
            next_id: Arc::new(AtomicU64::new(1)),
            production: self.production,
            batch,
        })
    }
}

impl HttpTransport {
    pub fn builder(url: &str) -> HttpTransportBuilder {
        HttpTransportBuilder {
            url: url.to_owned(),
            retry: RetryPolicy::default(),
            timeout: None,
            batch: None,
            production: false,
        }
    }

    pub fn new(url: &str) -> Result<Self, ClientError> {
        Self::builder(url).build()
    }

    async fn request_once(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        execute_single(&self.client, &self.url, &request).await
    }
}

async fn execute_single(
    client: &reqwest::Client,
    url: &str,
    request: &RpcRequest,
) -> Result<Value, ClientError> {
    let method = request.method.as_str();
    trace!("POST {} '{}'", url, method);
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ClientError::network(method, e))?;
    let parsed: RpcResponse = response
        .json()
        .await
        .map_err(|e| ClientError::network(method, e))?;
    parsed
        .into_result()
        .map_err(|error| ClientError::rpc(method, error))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        if let Some(batch) = &self.batch {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let request = RpcRequest::new(id, method, params);
            let (respond, receiver) = oneshot::channel();
            batch
                .send(BatchEntry { request, respond })
                .map_err(|_| ClientError::network(method, NetworkError::ConnectionClosed))?;
            // Dropping the returned future before the reply arrives drops
            // `receiver`; the dispatcher's send then fails harmlessly and
            // nothing is leaked.
            return receiver
                .await
                .map_err(|_| ClientError::network(method, NetworkError::ResponseDropped))?;
        }

        with_retry(&self.retry, method, || {
            self.request_once(method, params.clone())
        })
        .await
    }

    fn is_production(&self) -> bool {
        self.production
    }
}

async fn run_batch_loop(
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    config: BatchConfig,
    mut rx: mpsc::UnboundedReceiver<BatchEntry>,
) {
    while let Some(first) = rx.recv().await {
        let mut entries = vec![first];
        let window = tokio::time::sleep(config.wait);
        tokio::pin!(window);
        loop {
            if entries.len() >= config.max_size {
                break;
            }
            tokio::select! {
                biased;
                next = rx.recv() => match next {
                    Some(entry) => entries.push(entry),
                    None => break,
                },
                _ = &mut window => break,
            }
        }
        debug!("dispatching batch of {} request(s)", entries.len());
        dispatch_batch(&client, &url, &retry, entries).await;
    }
}

async fn dispatch_batch(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryPolicy,
    entries: Vec<BatchEntry>,
) {
    let requests: Vec<RpcRequest> = entries.iter().map(|e| e.request.clone()).collect();

    // The wire call is re-issued as a whole, so it is only safe when every
    // request in the window is an idempotent read.
    let retries = if requests.iter().all(|r| is_idempotent(&r.method)) {
        retry.max_retries
    } else {
        0
    };

    let mut attempt = 0;
    let responses = loop {
        match execute_batch(client, url, &requests).await {
            Ok(responses) => break Ok(responses),
            Err(err) if attempt < retries => {
                tokio::time::sleep(retry.delay_for(attempt)).await;
                attempt += 1;
                debug!("batch retry {}/{} after: {}", attempt, retries, err);
            }
            Err(err) => break Err(err),
        }
    };

    match responses {
        Ok(responses) => deliver_responses(entries, responses),
        Err(err) => deliver_failure(entries, &err.to_string()),
    }
}

/// Per-request success/failure stays independent: match replies by id, fan
/// each one out to its own waiter. An entry the node did not answer fails
/// alone with `MissingBatchReply`.
fn deliver_responses(entries: Vec<BatchEntry>, responses: Vec<RpcResponse>) {
    let mut by_id: HashMap<Id, RpcResponse> = responses
        .into_iter()
        .filter_map(|r| r.id.clone().map(|id| (id, r)))
        .collect();
    for entry in entries {
        let method = entry.request.method.clone();
        let result = match by_id.remove(&entry.request.id) {
            Some(response) => response
                .into_result()
                .map_err(|error| ClientError::rpc(&method, error)),
            None => Err(ClientError::network(
                &method,
                NetworkError::MissingBatchReply,
            )),
        };
        let _ = entry.respond.send(result);
    }
}

/// The wire call itself failed; every waiter in the window gets the detail.
fn deliver_failure(entries: Vec<BatchEntry>, detail: &str) {
    for entry in entries {
        let _ = entry.respond.send(Err(ClientError::network(
            &entry.request.method,
            NetworkError::BatchFailed(detail.to_owned()),
        )));
    }
}

async fn execute_batch(
    client: &reqwest::Client,
    url: &str,
    requests: &[RpcRequest],
) -> Result<Vec<RpcResponse>, reqwest::Error> {
    trace!("POST {} batch x{}", url, requests.len());
    client
        .post(url)
        .json(requests)
        .send()
        .await
        .and_then(|r| r.error_for_status())?
        .json()
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(
        id: u64,
        method: &str,
    ) -> (
        BatchEntry,
        oneshot::Receiver<Result<Value, ClientError>>,
    ) {
        let (respond, receiver) = oneshot::channel();
        let entry = BatchEntry {
            request: RpcRequest::new(id, method, json!([])),
            respond,
        };
        (entry, receiver)
    }

    fn response(raw: Value) -> RpcResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn test_batch_failure_does_not_fail_siblings() {
        let (first, first_rx) = entry(1, "eth_blockNumber");
        let (second, second_rx) = entry(2, "eth_chainId");

        deliver_responses(
            vec![first, second],
            vec![
                response(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})),
                response(json!({
                    "jsonrpc": "2.0",
                    "id": 2,
                    "error": {"code": -32000, "message": "boom"},
                })),
            ],
        );

        assert_eq!(first_rx.await.unwrap().unwrap(), json!("0x10"));
        let err = second_rx.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Rpc { .. }));
    }

    #[tokio::test]
    async fn test_batch_replies_match_by_id_not_position() {
        let (first, first_rx) = entry(1, "eth_blockNumber");
        let (second, second_rx) = entry(2, "eth_chainId");

        // node answered out of order
        deliver_responses(
            vec![first, second],
            vec![
                response(json!({"jsonrpc": "2.0", "id": 2, "result": "0xa"})),
                response(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})),
            ],
        );

        assert_eq!(first_rx.await.unwrap().unwrap(), json!("0x10"));
        assert_eq!(second_rx.await.unwrap().unwrap(), json!("0xa"));
    }

    #[tokio::test]
    async fn test_unanswered_batch_entry_fails_alone() {
        let (first, first_rx) = entry(1, "eth_blockNumber");
        let (second, second_rx) = entry(2, "eth_chainId");

        deliver_responses(
            vec![first, second],
            vec![response(
                json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"}),
            )],
        );

        assert!(first_rx.await.unwrap().is_ok());
        let err = second_rx.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Network {
                source: NetworkError::MissingBatchReply,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wire_failure_fails_the_whole_window() {
        let (first, first_rx) = entry(1, "eth_blockNumber");
        let (second, second_rx) = entry(2, "eth_chainId");

        deliver_failure(vec![first, second], "connection refused");

        for rx in [first_rx, second_rx] {
            let err = rx.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                ClientError::Network {
                    source: NetworkError::BatchFailed(_),
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_poison_delivery() {
        let (first, first_rx) = entry(1, "eth_blockNumber");
        let (second, second_rx) = entry(2, "eth_chainId");
        drop(first_rx);

        deliver_responses(
            vec![first, second],
            vec![
                response(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})),
                response(json!({"jsonrpc": "2.0", "id": 2, "result": "0xa"})),
            ],
        );

        // the gone caller is skipped, its sibling still gets a reply
        assert_eq!(second_rx.await.unwrap().unwrap(), json!("0xa"));
    }
}
