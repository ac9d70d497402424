use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axon_core::config::RelayConfig;
use axon_core::{Error, FaultHub, FaultKind, Result};
use axon_relay::RelayClient;
use axon_rpc::Dispatcher;
use axon_tools::{Tool, ToolContext, ToolProvider, ToolRegistry, ToolSchema};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "test.echo",
            description: "Echo the message argument",
            parameters: json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("message").and_then(|v| v.as_str()).is_none() {
            return Err(Error::Validation("Missing required parameter: message".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, _ctx: ToolContext, params: Value) -> Result<Value> {
        Ok(params["message"].clone())
    }
}

struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "test.slow",
            description: "Sleeps before answering",
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _ctx: ToolContext, _params: Value) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(json!("slow done"))
    }
}

struct TestProvider;

impl ToolProvider for TestProvider {
    fn name(&self) -> &str {
        "test"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(EchoTool), Arc::new(SlowTool)]
    }
}

struct Harness {
    listener: TcpListener,
    faults: Arc<FaultHub>,
    _workspace: tempfile::TempDir,
}

async fn start_client(reconnect_delay_secs: u64) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let workspace = tempfile::tempdir().unwrap();
    let registry = Arc::new(ToolRegistry::load(vec![Arc::new(TestProvider)]));
    let mut ctx = ToolContext::bare(workspace.path().to_path_buf());
    let faults = ctx.faults.clone();
    ctx.config.relay.url = format!("ws://127.0.0.1:{}/ws", port);
    let dispatcher = Arc::new(Dispatcher::new(registry, ctx));

    let config = RelayConfig {
        enabled: true,
        url: format!("ws://127.0.0.1:{}/ws", port),
        reconnect_delay_secs,
        ping_interval_secs: 1,
        ping_timeout_secs: 300,
    };
    let client = RelayClient::new(config, dispatcher, faults.clone());
    tokio::spawn(async move { client.run_forever().await });

    Harness {
        listener,
        faults,
        _workspace: workspace,
    }
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Read frames until the next text message, answering pings along the way.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a text frame")
            .expect("connection closed")
            .expect("transport error");
        match msg {
            WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            WsMessage::Ping(payload) => {
                ws.send(WsMessage::Pong(payload)).await.unwrap();
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_sync_pushed_on_connect_then_requests_served() {
    let harness = start_client(1).await;
    let mut ws = accept_ws(&harness.listener).await;

    // First frame after connect is always the capability sync.
    let sync = next_text(&mut ws).await;
    assert_eq!(sync["id"], json!("__sync_tools__"));
    assert_eq!(sync["type"], json!("sync_response"));
    assert!(sync["tools"]["test.echo"]["inputSchema"].is_object());

    ws.send(WsMessage::Text(
        r#"{"id":"1","tool":"test.echo","args":{"message":"ping me"}}"#.to_string(),
    ))
    .await
    .unwrap();
    let resp = next_text(&mut ws).await;
    assert_eq!(resp, json!({"id": "1", "result": "ping me"}));
}

#[tokio::test]
async fn test_unknown_tool_and_sync_request_over_wire() {
    let harness = start_client(1).await;
    let mut ws = accept_ws(&harness.listener).await;
    let _sync = next_text(&mut ws).await;

    ws.send(WsMessage::Text(
        r#"{"id":7,"tool":"test.missing","args":{}}"#.to_string(),
    ))
    .await
    .unwrap();
    let resp = next_text(&mut ws).await;
    assert_eq!(resp["id"], json!(7));
    assert_eq!(resp["error"], json!("Unknown tool: test.missing"));

    // A sync request triggers a fresh capability push.
    ws.send(WsMessage::Text(r#"{"type":"sync_request"}"#.to_string()))
        .await
        .unwrap();
    let sync = next_text(&mut ws).await;
    assert_eq!(sync["id"], json!("__sync_tools__"));
}

#[tokio::test]
async fn test_malformed_message_is_dropped_but_connection_survives() {
    let harness = start_client(1).await;
    let mut ws = accept_ws(&harness.listener).await;
    let _sync = next_text(&mut ws).await;

    ws.send(WsMessage::Text("{broken json".to_string())).await.unwrap();
    ws.send(WsMessage::Text(
        r#"{"id":"ok","tool":"test.echo","args":{"message":"still here"}}"#.to_string(),
    ))
    .await
    .unwrap();

    // The corrupt envelope produced no response; the next one did.
    let resp = next_text(&mut ws).await;
    assert_eq!(resp, json!({"id": "ok", "result": "still here"}));
}

#[tokio::test]
async fn test_concurrent_requests_answered_out_of_order() {
    let harness = start_client(1).await;
    let mut ws = accept_ws(&harness.listener).await;
    let _sync = next_text(&mut ws).await;

    ws.send(WsMessage::Text(r#"{"id":"slow","tool":"test.slow","args":{}}"#.to_string()))
        .await
        .unwrap();
    ws.send(WsMessage::Text(
        r#"{"id":"fast","tool":"test.echo","args":{"message":"quick"}}"#.to_string(),
    ))
    .await
    .unwrap();

    let first = next_text(&mut ws).await;
    assert_eq!(first, json!({"id": "fast", "result": "quick"}));
    let second = next_text(&mut ws).await;
    assert_eq!(second, json!({"id": "slow", "result": "slow done"}));
}

#[tokio::test]
async fn test_reconnects_after_fixed_delay_and_resyncs() {
    let harness = start_client(1).await;
    let mut ws = accept_ws(&harness.listener).await;
    let _sync = next_text(&mut ws).await;

    // Kill the connection server-side.
    let dropped_at = Instant::now();
    drop(ws);

    // The client comes back after the fixed delay and pushes a fresh sync.
    let mut ws = accept_ws(&harness.listener).await;
    let elapsed = dropped_at.elapsed();
    assert!(
        elapsed >= Duration::from_millis(900),
        "reconnected too fast: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(5),
        "reconnected too slow: {elapsed:?}"
    );
    let sync = next_text(&mut ws).await;
    assert_eq!(sync["id"], json!("__sync_tools__"));

    // The loss was published as a transport fault.
    assert_eq!(harness.faults.latest().unwrap().kind, FaultKind::TransportLost);

    // And the new connection serves requests as before.
    ws.send(WsMessage::Text(
        r#"{"id":"again","tool":"test.echo","args":{"message":"back"}}"#.to_string(),
    ))
    .await
    .unwrap();
    let resp = next_text(&mut ws).await;
    assert_eq!(resp, json!({"id": "again", "result": "back"}));
}
