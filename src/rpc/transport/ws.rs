use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, trace, warn};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite_wasm::{connect, Message, WebSocketStream};

use super::{RetryPolicy, Transport};
use crate::{
    error::{ClientError, NetworkError},
    rpc::{RpcRequest, RpcResponse},
};

/// Lifecycle of the shared socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// What happens to requests submitted while the connection is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Hold requests and flush them once the socket is back.
    Queue,
    /// Fail immediately with a network error.
    FailFast,
}

type Waiter = oneshot::Sender<Result<Value, ClientError>>;

struct PendingCall {
    method: String,
    respond: Waiter,
}

struct QueuedRequest {
    id: u64,
    request: RpcRequest,
    respond: Waiter,
}

struct WsShared {
    url: String,
    state: StdMutex<ConnectionState>,
    writer: Mutex<Option<SplitSink<WebSocketStream, Message>>>,
    pending: StdMutex<HashMap<u64, PendingCall>>,
    queued: StdMutex<Vec<QueuedRequest>>,
    next_id: AtomicU64,
    policy: ReconnectPolicy,
    retry: RetryPolicy,
    request_timeout: Option<Duration>,
    production: bool,
}

/// JSON-RPC over a persistent WebSocket. One shared connection, responses
/// multiplexed back to their waiters by request id. At most one reconnect
/// attempt is in flight at any time.
pub struct WebSocketTransport {
    shared: Arc<WsShared>,
}

pub struct WebSocketTransportBuilder {
    url: String,
    policy: ReconnectPolicy,
    retry: RetryPolicy,
    request_timeout: Option<Duration>,
    production: bool,
}

impl WebSocketTransportBuilder {
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Backoff schedule used between reconnect attempts.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn production(mut self) -> Self {
        self.production = true;
        self
    }

    pub async fn connect(self) -> Result<WebSocketTransport, ClientError> {
        let shared = Arc::new(WsShared {
            url: self.url,
            state: StdMutex::new(ConnectionState::Connecting),
            writer: Mutex::new(None),
            pending: StdMutex::new(HashMap::new()),
            queued: StdMutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            policy: self.policy,
            retry: self.retry,
            request_timeout: self.request_timeout,
            production: self.production,
        });

        let stream = connect(shared.url.as_str())
            .await
            .map_err(|e| ClientError::network("ws_connect", e))?;
        attach_stream(&shared, stream).await;

        Ok(WebSocketTransport { shared })
    }
}

impl WebSocketTransport {
    pub fn builder(url: &str) -> WebSocketTransportBuilder {
        WebSocketTransportBuilder {
            url: url.to_owned(),
            policy: ReconnectPolicy::Queue,
            retry: RetryPolicy::default(),
            request_timeout: None,
            production: false,
        }
    }

    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        Self::builder(url).connect().await
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().expect("state lock poisoned")
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Close the connection for good. Pending and queued requests fail with
    /// a connection-closed error; no reconnect is attempted.
    pub async fn close(&self) -> Result<(), ClientError> {
        set_state(&self.shared, ConnectionState::Closed);
        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        fail_waiters(&self.shared);
        Ok(())
    }
}

fn set_state(shared: &WsShared, state: ConnectionState) {
    *shared.state.lock().expect("state lock poisoned") = state;
}

/// Transition into Reconnecting. Returns false when another reconnect is
/// already in flight or the transport was closed, which keeps reconnects
/// serialized.
fn begin_reconnect(shared: &WsShared) -> bool {
    let mut state = shared.state.lock().expect("state lock poisoned");
    match *state {
        ConnectionState::Closed | ConnectionState::Reconnecting => false,
        _ => {
            *state = ConnectionState::Reconnecting;
            true
        }
    }
}

async fn attach_stream(shared: &Arc<WsShared>, stream: WebSocketStream) {
    let (sink, read) = stream.split();
    *shared.writer.lock().await = Some(sink);
    set_state(shared, ConnectionState::Connected);
    tokio::spawn(read_loop(shared.clone(), read));
}

// Boxed return type: the reader awaits the reconnect path, which attaches a
// new stream and spawns the next reader. Erasing the future type here keeps
// that cycle out of the compiler's Send inference.
fn read_loop(
    shared: Arc<WsShared>,
    mut read: SplitStream<WebSocketStream>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => handle_frame(&shared, &text),
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => handle_frame(&shared, text),
                    Err(_) => warn!("discarding non-UTF8 binary frame"),
                },
                Ok(Message::Close(_)) => {
                    debug!("server closed the websocket");
                    break;
                }
                Err(e) => {
                    warn!("websocket read failed: {}", e);
                    break;
                }
            }
        }
        on_connection_lost(shared).await;
    })
}

fn handle_frame(shared: &WsShared, text: &str) {
    let response: RpcResponse = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(e) => {
            warn!("discarding unparseable frame: {}", e);
            return;
        }
    };
    let id = match &response.id {
        Some(crate::rpc::Id::Number(n)) => *n,
        // Notifications and string-id frames are not ours
        _ => {
            trace!("ignoring frame without a numeric id");
            return;
        }
    };
    let call = shared.pending.lock().expect("pending lock poisoned").remove(&id);
    match call {
        Some(call) => {
            let result = response
                .into_result()
                .map_err(|error| ClientError::rpc(&call.method, error));
            // A dropped receiver means the caller gave up waiting; the entry
            // is already removed, so nothing leaks.
            let _ = call.respond.send(result);
        }
        None => trace!("no waiter for response id {}", id),
    }
}

fn fail_waiters(shared: &WsShared) {
    let pending: Vec<PendingCall> = {
        let mut map = shared.pending.lock().expect("pending lock poisoned");
        map.drain().map(|(_, call)| call).collect()
    };
    for call in pending {
        let _ = call.respond.send(Err(ClientError::network(
            &call.method,
            NetworkError::ConnectionClosed,
        )));
    }
    let queued: Vec<QueuedRequest> = {
        let mut queue = shared.queued.lock().expect("queue lock poisoned");
        queue.drain(..).collect()
    };
    for entry in queued {
        let _ = entry.respond.send(Err(ClientError::network(
            &entry.request.method,
            NetworkError::ConnectionClosed,
        )));
    }
}

async fn on_connection_lost(shared: Arc<WsShared>) {
    if !begin_reconnect(&shared) {
        return;
    }
    // In-flight requests died with the socket; their idempotent callers may
    // re-issue, we never do it for them here.
    let pending: Vec<PendingCall> = {
        let mut map = shared.pending.lock().expect("pending lock poisoned");
        map.drain().map(|(_, call)| call).collect()
    };
    for call in pending {
        let _ = call.respond.send(Err(ClientError::network(
            &call.method,
            NetworkError::ConnectionClosed,
        )));
    }
    shared.writer.lock().await.take();

    let max = shared.retry.max_retries.max(1);
    for attempt in 0..max {
        let delay = shared.retry.delay_for(attempt);
        debug!("reconnect attempt {}/{} in {:?}", attempt + 1, max, delay);
        tokio::time::sleep(delay).await;
        if *shared.state.lock().expect("state lock poisoned") == ConnectionState::Closed {
            return;
        }
        match connect(shared.url.as_str()).await {
            Ok(stream) => {
                attach_stream(&shared, stream).await;
                debug!("websocket reconnected");
                flush_queue(&shared).await;
                return;
            }
            Err(e) => warn!("reconnect failed: {}", e),
        }
    }
    set_state(&shared, ConnectionState::Disconnected);
    fail_waiters(&shared);
}

async fn flush_queue(shared: &Arc<WsShared>) {
    let queued: Vec<QueuedRequest> = {
        let mut queue = shared.queued.lock().expect("queue lock poisoned");
        queue.drain(..).collect()
    };
    if !queued.is_empty() {
        debug!("flushing {} queued request(s)", queued.len());
    }
    for entry in queued {
        if let Err(err) = send_request(shared, entry.id, &entry.request, entry.respond).await {
            warn!("failed to flush queued request: {}", err);
        }
    }
}

/// Register the waiter, then put the frame on the wire.
async fn send_request(
    shared: &Arc<WsShared>,
    id: u64,
    request: &RpcRequest,
    respond: Waiter,
) -> Result<(), ClientError> {
    let payload = serde_json::to_string(request).map_err(|e| ClientError::Decode {
        method: request.method.clone(),
        source: e,
    })?;

    shared.pending.lock().expect("pending lock poisoned").insert(
        id,
        PendingCall {
            method: request.method.clone(),
            respond,
        },
    );

    let mut writer = shared.writer.lock().await;
    let sink = match writer.as_mut() {
        Some(sink) => sink,
        None => {
            // Lost the connection between the state check and here
            drop(writer);
            if let Some(call) = shared
                .pending
                .lock()
                .expect("pending lock poisoned")
                .remove(&id)
            {
                let _ = call.respond.send(Err(ClientError::network(
                    &request.method,
                    NetworkError::ConnectionClosed,
                )));
            }
            return Ok(());
        }
    };
    if let Err(e) = sink.send(Message::Text(payload.into())).await {
        drop(writer);
        if let Some(call) = shared
            .pending
            .lock()
            .expect("pending lock poisoned")
            .remove(&id)
        {
            let _ = call.respond.send(Err(ClientError::network(&request.method, e)));
        }
    }
    Ok(())
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        let (respond, receiver) = oneshot::channel();

        let state = self.state();
        match state {
            ConnectionState::Connected => {
                send_request(&self.shared, id, &request, respond).await?;
            }
            ConnectionState::Closed | ConnectionState::Disconnected => {
                return Err(ClientError::network(method, NetworkError::ConnectionClosed));
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => match self.shared.policy
            {
                ReconnectPolicy::Queue => {
                    trace!("queueing '{}' while {:?}", method, state);
                    self.shared
                        .queued
                        .lock()
                        .expect("queue lock poisoned")
                        .push(QueuedRequest { id, request, respond });
                }
                ReconnectPolicy::FailFast => {
                    return Err(ClientError::network(method, NetworkError::ConnectionClosed));
                }
            },
        }

        let reply = match self.shared.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, receiver).await {
                Ok(reply) => reply,
                Err(_) => {
                    // Release the wait slot; the wire request may still
                    // complete server-side and its late reply is dropped. A
                    // copy still waiting in the reconnect queue is withdrawn
                    // too, so it is never dispatched for a gone caller.
                    self.shared
                        .pending
                        .lock()
                        .expect("pending lock poisoned")
                        .remove(&id);
                    self.shared
                        .queued
                        .lock()
                        .expect("queue lock poisoned")
                        .retain(|entry| entry.id != id);
                    return Err(ClientError::network(
                        method,
                        NetworkError::Timeout(timeout.as_millis()),
                    ));
                }
            },
            None => receiver.await,
        };
        reply.map_err(|_| ClientError::network(method, NetworkError::ResponseDropped))?
    }

    fn is_production(&self) -> bool {
        self.shared.production
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shared_for_test(
        state: ConnectionState,
        policy: ReconnectPolicy,
        request_timeout: Option<Duration>,
    ) -> Arc<WsShared> {
        Arc::new(WsShared {
            url: "ws://localhost:0".to_owned(),
            state: StdMutex::new(state),
            writer: Mutex::new(None),
            pending: StdMutex::new(HashMap::new()),
            queued: StdMutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            policy,
            retry: RetryPolicy::none(),
            request_timeout,
            production: false,
        })
    }

    #[test]
    fn test_reader_future_is_send() {
        // the reader must be spawnable onto a multi-threaded runtime
        fn assert_send<F: Future<Output = ()> + Send + 'static>(_: Option<F>) {}
        let none: Option<(Arc<WsShared>, SplitStream<WebSocketStream>)> = None;
        assert_send(none.map(|(shared, read)| read_loop(shared, read)));
    }

    #[tokio::test]
    async fn test_timeout_withdraws_queued_request() {
        let shared = shared_for_test(
            ConnectionState::Reconnecting,
            ReconnectPolicy::Queue,
            Some(Duration::from_millis(20)),
        );
        let transport = WebSocketTransport {
            shared: shared.clone(),
        };

        let err = transport
            .request("eth_blockNumber", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Network {
                source: NetworkError::Timeout(_),
                ..
            }
        ));
        // the timed-out call left nothing behind to be dispatched later
        assert!(shared.queued.lock().unwrap().is_empty());
        assert!(shared.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_rejects_while_reconnecting() {
        let shared = shared_for_test(ConnectionState::Reconnecting, ReconnectPolicy::FailFast, None);
        let transport = WebSocketTransport { shared };

        let err = transport
            .request("eth_blockNumber", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Network {
                source: NetworkError::ConnectionClosed,
                ..
            }
        ));
    }
}
