use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex as StdMutex,
    },
};

use async_trait::async_trait;
use log::{trace, warn};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixStream,
    },
    sync::{oneshot, Mutex},
};

use super::Transport;
use crate::{
    error::{ClientError, NetworkError},
    rpc::{Id, RpcRequest, RpcResponse},
};

type Waiter = oneshot::Sender<Result<Value, ClientError>>;

struct PendingCall {
    method: String,
    respond: Waiter,
}

struct IpcShared {
    writer: Mutex<OwnedWriteHalf>,
    pending: StdMutex<HashMap<u64, PendingCall>>,
    next_id: AtomicU64,
    alive: AtomicBool,
    production: bool,
}

/// JSON-RPC over a local Unix socket, newline-delimited frames. Multiplexed
/// like the WebSocket transport, but with no reconnect: a dead local node is
/// surfaced to the caller immediately.
pub struct IpcTransport {
    shared: Arc<IpcShared>,
}

impl IpcTransport {
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        Self::connect_with(path, false).await
    }

    pub async fn connect_with<P: AsRef<Path>>(
        path: P,
        production: bool,
    ) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path.as_ref())
            .await
            .map_err(|e| ClientError::network("ipc_connect", e))?;
        let (read, write) = stream.into_split();
        let shared = Arc::new(IpcShared {
            writer: Mutex::new(write),
            pending: StdMutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
            production,
        });
        tokio::spawn(read_loop(shared.clone(), read));
        Ok(Self { shared })
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }
}

async fn read_loop(shared: Arc<IpcShared>, read: OwnedReadHalf) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_frame(&shared, &line),
            Ok(None) => break,
            Err(e) => {
                warn!("ipc read failed: {}", e);
                break;
            }
        }
    }
    shared.alive.store(false, Ordering::SeqCst);
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
}

fn handle_frame(shared: &IpcShared, line: &str) {
    let response: RpcResponse = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(e) => {
            warn!("discarding unparseable ipc frame: {}", e);
            return;
        }
    };
    let id = match &response.id {
        Some(Id::Number(n)) => *n,
        _ => {
            trace!("ignoring ipc frame without a numeric id");
            return;
        }
    };
    let call = shared
        .pending
        .lock()
        .expect("pending lock poisoned")
        .remove(&id);
    if let Some(call) = call {
        let result = response
            .into_result()
            .map_err(|error| ClientError::rpc(&call.method, error));
        let _ = call.respond.send(result);
    }
}

#[async_trait]
impl Transport for IpcTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        if !self.is_alive() {
            return Err(ClientError::network(method, NetworkError::ConnectionClosed));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        let mut payload = serde_json::to_vec(&request).map_err(|e| ClientError::Decode {
            method: method.to_owned(),
            source: e,
        })?;
        payload.push(b'\n');

        let (respond, receiver) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .expect("pending lock poisoned")
            .insert(
                id,
                PendingCall {
                    method: method.to_owned(),
                    respond,
                },
            );

        {
            let mut writer = self.shared.writer.lock().await;
            if let Err(e) = writer.write_all(&payload).await {
                self.shared
                    .pending
                    .lock()
                    .expect("pending lock poisoned")
                    .remove(&id);
                return Err(ClientError::network(method, e));
            }
        }

        receiver
            .await
            .map_err(|_| ClientError::network(method, NetworkError::ResponseDropped))?
    }

    fn is_production(&self) -> bool {
        self.shared.production
    }
}
