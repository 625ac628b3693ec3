//! Request multiplexing over a single session.
//!
//! [`RpcClient`] lets any number of requests share one connection. Each
//! request gets an id from a per-client counter and parks on a `oneshot`
//! until the dispatch task sees the matching response. Responses are paired
//! by id only; arrival order does not matter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{McpError, Result};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Session, SessionEvent};

/// A request waiting for its response.
struct Pending {
    generation: u64,
    method: String,
    tx: oneshot::Sender<Result<Value>>,
}

struct RpcInner {
    session: Session,
    pending: Mutex<HashMap<String, Pending>>,
    next_id: AtomicU64,
    request_timeout: Option<Duration>,
}

impl RpcInner {
    /// Resolve the pending request a frame answers.
    fn route(&self, text: &str) {
        let response: JsonRpcResponse = match serde_json::from_str(text) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparsable frame from tool host");
                return;
            }
        };

        let Some(id) = response.id_key() else {
            tracing::debug!("ignoring frame without id");
            return;
        };

        let Some(pending) = self.pending.lock().remove(&id) else {
            tracing::warn!(id = %id, "received response for unknown request id");
            return;
        };

        let outcome = response
            .into_result()
            .map_err(|e| McpError::remote(e.code, e.message));
        if let Err(ref e) = outcome {
            tracing::debug!(id = %id, method = %pending.method, error = %e, "request failed on host");
        }
        let _ = pending.tx.send(outcome);
    }

    /// Fail every request sent on the connection of `generation`.
    fn fail_generation(&self, generation: u64) -> usize {
        let failed: Vec<Pending> = {
            let mut pending = self.pending.lock();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, p)| p.generation == generation)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| pending.remove(id)).collect()
        };
        let count = failed.len();
        for pending in failed {
            let _ = pending.tx.send(Err(McpError::ConnectionLost));
        }
        count
    }

    fn fail_all(&self) -> usize {
        let failed: Vec<Pending> = self.pending.lock().drain().map(|(_, p)| p).collect();
        let count = failed.len();
        for pending in failed {
            let _ = pending.tx.send(Err(McpError::ConnectionLost));
        }
        count
    }
}

/// Removes a pending entry when the waiting call finishes or is dropped.
struct PendingGuard<'a> {
    inner: &'a RpcInner,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(&self.id);
    }
}

/// Correlates concurrent requests and responses over one [`Session`].
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<RpcInner>,
}

impl RpcClient {
    /// Create a multiplexer over `session`.
    ///
    /// Spawns the dispatch task, so this must run inside a Tokio runtime.
    pub fn new(session: Session, request_timeout: Option<Duration>) -> Self {
        let events = session.subscribe();
        let inner = Arc::new(RpcInner {
            session,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            request_timeout,
        });
        tokio::spawn(dispatch(Arc::downgrade(&inner), events));
        Self { inner }
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Per-request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.inner.request_timeout
    }

    fn next_request_id(&self) -> String {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Send a request and wait for its result.
    ///
    /// Connects first if the session is not connected.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.session.connect().await?;
        let generation = self
            .inner
            .session
            .generation()
            .ok_or(McpError::ConnectionLost)?;

        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id.clone(), method, params);
        let text = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(
            id.clone(),
            Pending {
                generation,
                method: method.to_string(),
                tx,
            },
        );
        let _guard = PendingGuard {
            inner: &self.inner,
            id: id.clone(),
        };

        self.inner.session.send_on(generation, text)?;
        tracing::debug!(id = %id, method, "sent request");

        let outcome = match self.inner.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(id = %id, method, timeout_ms = limit.as_millis() as u64, "request timed out");
                    return Err(McpError::RequestTimeout {
                        method: method.to_string(),
                    });
                }
            },
            None => rx.await,
        };

        outcome.unwrap_or(Err(McpError::ConnectionLost))
    }

    /// Close the session and fail every outstanding request with `ConnectionLost`.
    pub fn disconnect(&self) {
        self.inner.session.disconnect();
        let failed = self.inner.fail_all();
        if failed > 0 {
            tracing::info!(failed, "failed outstanding requests on disconnect");
        }
    }
}

async fn dispatch(inner: Weak<RpcInner>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match event {
            SessionEvent::Message { text, .. } => inner.route(&text),
            SessionEvent::Disconnected { generation, .. } => {
                let failed = inner.fail_generation(generation);
                if failed > 0 {
                    tracing::warn!(generation, failed, "connection lost with requests outstanding");
                }
            }
            SessionEvent::Connected { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SessionConfig;

    fn client() -> RpcClient {
        let session = Session::new(SessionConfig::new("ws://127.0.0.1:9")).unwrap();
        RpcClient::new(session, None)
    }

    fn park(client: &RpcClient, id: &str, generation: u64) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        client.inner.pending.lock().insert(
            id.to_string(),
            Pending {
                generation,
                method: "call_tool".to_string(),
                tx,
            },
        );
        rx
    }

    #[tokio::test]
    async fn test_request_ids_are_unique() {
        let client = client();
        let a = client.next_request_id();
        let b = client.next_request_id();
        assert_ne!(a, b);
        assert_eq!(a, "1");
        assert_eq!(b, "2");
    }

    #[tokio::test]
    async fn test_route_success_and_error() {
        let client = client();
        let ok = park(&client, "1", 1);
        let err = park(&client, "2", 1);

        client.inner.route(r#"{"id":"2","error":{"message":"boom"}}"#);
        client.inner.route(r#"{"id":1,"result":{"value":42}}"#);

        assert_eq!(ok.await.unwrap().unwrap()["value"], 42);
        match err.await.unwrap() {
            Err(McpError::RemoteError { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("expected remote error, got {:?}", other),
        }
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_route_ignores_unknown_and_garbage() {
        let client = client();
        let _rx = park(&client, "1", 1);
        client.inner.route("not json");
        client.inner.route(r#"{"id":"99","result":{}}"#);
        client.inner.route(r#"{"method":"notify"}"#);
        assert_eq!(client.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_generation_only_touches_that_connection() {
        let client = client();
        let old = park(&client, "1", 1);
        let new = park(&client, "2", 2);

        assert_eq!(client.inner.fail_generation(1), 1);
        assert!(matches!(old.await.unwrap(), Err(McpError::ConnectionLost)));
        assert_eq!(client.pending_count(), 1);

        client.disconnect();
        assert!(matches!(new.await.unwrap(), Err(McpError::ConnectionLost)));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_request_propagates_connect_failure() {
        let session = Session::new(
            SessionConfig::new("ws://127.0.0.1:9").with_connect_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let client = RpcClient::new(session, None);
        let err = client
            .send_request("list_tools", Value::Null)
            .await
            .unwrap_err();
        assert!(err.is_connection_error(), "unexpected error: {:?}", err);
        assert_eq!(client.pending_count(), 0);
    }
}
