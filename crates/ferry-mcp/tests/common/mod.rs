//! In-process tool host for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How the mock host behaves.
#[derive(Clone, Default)]
pub struct HostOptions {
    /// Buffer `call_tool` replies until `order.len()` are held, then send them
    /// in this order (indices into arrival order).
    pub release_order: Option<Vec<usize>>,
    /// Raw frames pushed to the client right after the handshake.
    pub greeting: Vec<String>,
}

/// A WebSocket tool host on a random local port.
pub struct MockHost {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub list_calls: Arc<AtomicUsize>,
    pub tool_calls: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockHost {
    pub async fn start() -> Self {
        Self::start_with(HostOptions::default()).await
    }

    pub async fn start_with(options: HostOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let list_calls = Arc::new(AtomicUsize::new(0));
        let tool_calls = Arc::new(AtomicUsize::new(0));

        let counters = (
            Arc::clone(&connections),
            Arc::clone(&list_calls),
            Arc::clone(&tool_calls),
        );
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counters.0.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    options.clone(),
                    Arc::clone(&counters.1),
                    Arc::clone(&counters.2),
                ));
            }
        });

        Self {
            addr,
            connections,
            list_calls,
            tool_calls,
            task,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tools the mock host advertises.
pub fn advertised_tools() -> Value {
    json!([
        {
            "name": "echo",
            "description": "Echo back the message",
            "parameters": {"message": {"type": "string"}}
        },
        {
            "name": "add",
            "description": "Add two numbers",
            "parameters": {"a": {"type": "number"}, "b": {"type": "number"}}
        },
        {"name": "fail", "description": "Always fails", "parameters": {}},
        {"name": "hang", "description": "Never answers", "parameters": {}},
        {"name": "drop", "description": "Closes the socket", "parameters": {}}
    ])
}

async fn serve(
    stream: TcpStream,
    options: HostOptions,
    list_calls: Arc<AtomicUsize>,
    tool_calls: Arc<AtomicUsize>,
) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut incoming) = ws.split();

    for frame in &options.greeting {
        if sink.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }

    let mut held: Vec<Value> = Vec::new();

    while let Some(Ok(message)) = incoming.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(text.as_str()).unwrap();
        let id = request["id"].clone();

        let reply = match request["method"].as_str() {
            Some("list_tools") => {
                list_calls.fetch_add(1, Ordering::SeqCst);
                json!({"id": id, "result": {"tools": advertised_tools()}})
            }
            Some("call_tool") => {
                tool_calls.fetch_add(1, Ordering::SeqCst);
                let name = request["params"]["name"].as_str().unwrap_or_default();
                let arguments = &request["params"]["arguments"];
                match name {
                    "echo" => json!({
                        "id": id,
                        "result": {
                            "content": [{"type": "text", "text": arguments["message"]}],
                            "sources": [{"title": "X", "content": "Y"}]
                        }
                    }),
                    "add" => {
                        let sum = arguments["a"].as_f64().unwrap_or(0.0)
                            + arguments["b"].as_f64().unwrap_or(0.0);
                        json!({
                            "id": id,
                            "result": {"content": [{"type": "text", "text": sum.to_string()}]}
                        })
                    }
                    "fail" => json!({"id": id, "error": {"message": "boom"}}),
                    "hang" => continue,
                    "drop" => {
                        let _ = sink.close().await;
                        return;
                    }
                    other => json!({
                        "id": id,
                        "error": {"code": -32601, "message": format!("unknown tool: {}", other)}
                    }),
                }
            }
            _ => json!({"id": id, "error": {"code": -32601, "message": "method not found"}}),
        };

        let is_tool_reply = request["method"] == "call_tool";
        match &options.release_order {
            Some(order) if is_tool_reply => {
                held.push(reply);
                if held.len() == order.len() {
                    for &index in order {
                        let frame = held[index].to_string();
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            return;
                        }
                    }
                    held.clear();
                }
            }
            _ => {
                if sink
                    .send(Message::Text(reply.to_string().into()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// A listener that accepts TCP connections but never completes the handshake.
pub async fn silent_listener() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr, task)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
