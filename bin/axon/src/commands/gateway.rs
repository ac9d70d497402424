use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use axon_core::{Config, Fault, FaultHub, FaultKind, Paths};
use axon_engine::{spawn_log_listener, EngineBridge, LogCallback};
use axon_relay::{RelayClient, RelayHandle};
use axon_rpc::Dispatcher;
use axon_tools::{RegistryHandle, ToolContext, ToolRegistry};

#[derive(Clone)]
struct GatewayState {
    dispatcher: Arc<Dispatcher>,
    relay: RelayHandle,
}

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let workspace = config.workspace_dir(&paths);
    std::fs::create_dir_all(&workspace)?;

    let faults = Arc::new(FaultHub::new());

    // External-engine bridge + its out-of-band log stream.
    let engine = Arc::new(EngineBridge::new(
        Paths::expand_tilde(&config.engine.command_socket),
        Duration::from_secs(config.engine.call_timeout_secs),
        faults.clone(),
    ));
    let (_log_shutdown_tx, log_shutdown_rx) = tokio::sync::watch::channel(false);
    let log_faults = faults.clone();
    let log_callback: LogCallback = Arc::new(move |line: &str| {
        info!(target: "engine", "{}", line);
        // Structured error lines become observable faults.
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
                log_faults.publish(Fault::new(FaultKind::EngineReported, error));
            }
        }
    });
    let _log_task = spawn_log_listener(
        Paths::expand_tilde(&config.engine.log_socket),
        Duration::from_secs(config.engine.log_retry_secs.max(1)),
        log_callback,
        log_shutdown_rx,
    );

    let registry = Arc::new(ToolRegistry::with_defaults());
    let ctx = ToolContext {
        workspace,
        config: config.clone(),
        faults: faults.clone(),
        engine: Some(engine),
        registry: Some(registry.clone() as RegistryHandle),
    };
    let dispatcher = Arc::new(Dispatcher::new(registry, ctx));
    info!(
        tools = dispatcher.registry().snapshot().len(),
        "Tool registry loaded"
    );

    let relay_client = RelayClient::new(config.relay.clone(), dispatcher.clone(), faults);
    let relay_handle = relay_client.handle();
    if config.relay.enabled {
        tokio::spawn(async move { relay_client.run_forever().await });
    } else {
        warn!("Relay disabled in config, serving local transport only");
    }

    // Local JSON-RPC transport + health probe.
    let state = GatewayState {
        dispatcher,
        relay: relay_handle,
    };
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_health(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "connected": state.relay.is_connected(),
    }))
}

async fn handle_rpc(
    State(state): State<GatewayState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    Json(state.dispatcher.handle_jsonrpc(body).await)
}
