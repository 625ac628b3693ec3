//! Plan engine driving a real client against an in-process tool host.

use std::sync::Arc;
use std::time::Duration;

use ferry_agent::{PlanEngine, PlanEvent, PlanStatus, StepStatus, validate_plan};
use ferry_mcp::{ConnectionState, McpClient, McpServerConfig};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Host with the two tools the stub planner uses.
///
/// `main_tool` misbehaves depending on the goal: `fail` answers with an
/// error, `hang` never answers, `drop` closes the socket.
async fn start_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(ws) = accept_async(stream).await else {
                    return;
                };
                let (mut sink, mut incoming) = ws.split();
                while let Some(Ok(Message::Text(text))) = incoming.next().await {
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let id = request["id"].clone();
                    let reply = match request["method"].as_str() {
                        Some("list_tools") => json!({"id": id, "result": {"tools": [
                            {"name": "analyze_goal", "description": "Analyze", "parameters": {"goal": {"type": "string"}}},
                            {"name": "main_tool", "description": "Main", "parameters": {"goal": {"type": "string"}}}
                        ]}}),
                        _ => {
                            let tool = request["params"]["name"].as_str().unwrap_or_default();
                            let goal = request["params"]["arguments"]["goal"]
                                .as_str()
                                .unwrap_or_default()
                                .to_string();
                            match (tool, goal.as_str()) {
                                ("main_tool", "fail") => {
                                    json!({"id": id, "error": {"message": "boom"}})
                                }
                                ("main_tool", "hang") => continue,
                                ("main_tool", "drop") => {
                                    let _ = sink.close().await;
                                    return;
                                }
                                _ => json!({"id": id, "result": {
                                    "content": [{"type": "text", "text": format!("{}: {}", tool, goal)}]
                                }}),
                            }
                        }
                    };
                    if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    format!("ws://{}", addr)
}

async fn engine_for(endpoint: String) -> (Arc<McpClient>, PlanEngine) {
    let client = Arc::new(
        McpClient::connect_to(McpServerConfig::new(endpoint))
            .await
            .unwrap(),
    );
    let engine = PlanEngine::new(client.clone());
    (client, engine)
}

#[tokio::test]
async fn test_plan_completes_over_websocket() {
    let (client, engine) = engine_for(start_host().await).await;
    engine.set_goal("ok").await.unwrap();

    let tools = client.list_tools().await.unwrap();
    assert!(validate_plan(&engine.snapshot(), &tools).is_empty());

    assert_eq!(engine.run().await, PlanStatus::Completed);
    let plan = engine.snapshot();
    assert_eq!(plan.cursor, 2);
    assert_eq!(
        plan.steps[0].result.as_ref().unwrap().text(),
        "analyze_goal: ok"
    );
    assert_eq!(plan.steps[1].result.as_ref().unwrap().text(), "main_tool: ok");
}

#[tokio::test]
async fn test_remote_failure_halts_plan() {
    let (_client, engine) = engine_for(start_host().await).await;
    let mut events = engine.subscribe();
    engine.set_goal("fail").await.unwrap();

    assert_eq!(
        engine.run().await,
        PlanStatus::Failed {
            index: 1,
            error: "boom".to_string()
        }
    );

    let plan = engine.snapshot();
    assert_eq!(plan.cursor, 1);
    assert_eq!(plan.steps[0].status, StepStatus::Success);
    assert_eq!(plan.steps[1].status, StepStatus::Error);
    assert_eq!(plan.steps[1].error.as_deref(), Some("boom"));

    let mut failed = None;
    while let Ok(event) = events.try_recv() {
        if let PlanEvent::StepFailed { index, error, .. } = event {
            failed = Some((index, error));
        }
    }
    assert_eq!(failed, Some((1, "boom".to_string())));

    // A fresh goal starts over on the same connection.
    engine.set_goal("ok").await.unwrap();
    assert_eq!(engine.snapshot().cursor, 0);
    assert_eq!(engine.run().await, PlanStatus::Completed);
}

#[tokio::test]
async fn test_disconnect_mid_step_fails_step() {
    let (client, engine) = engine_for(start_host().await).await;
    let engine = Arc::new(engine);
    engine.set_goal("hang").await.unwrap();

    let runner = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while !(engine.snapshot().cursor == 1
            && engine.snapshot().steps[1].status == StepStatus::Running)
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("second step should start");

    client.disconnect();

    let status = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("step should not hang after disconnect")
        .unwrap();
    assert_eq!(
        status,
        PlanStatus::Failed {
            index: 1,
            error: "connection lost".to_string()
        }
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_host_drop_mid_step_fails_step() {
    let (_client, engine) = engine_for(start_host().await).await;
    engine.set_goal("drop").await.unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .expect("plan should settle");
    assert_eq!(
        status,
        PlanStatus::Failed {
            index: 1,
            error: "connection lost".to_string()
        }
    );
}

#[tokio::test]
async fn test_step_without_connection_fails() {
    let client = Arc::new(McpClient::new(McpServerConfig::new(start_host().await)).unwrap());
    let engine = PlanEngine::new(client);
    engine.set_goal("ok").await.unwrap();

    assert_eq!(
        engine.run().await,
        PlanStatus::Failed {
            index: 0,
            error: "not connected to tool host".to_string()
        }
    );
}
