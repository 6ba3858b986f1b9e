mod ws;

pub use ws::handle_client_frame;

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tracing::info;

use crate::{
    bridge::{BridgeTasks, SimHandle},
    error::ControlError,
    protocol::ControlAction,
    snapshot::{RegionListing, WorldSnapshot},
};

pub struct WebServerConfig {
    pub host: String,
    pub port: u16,
    /// Start ticking immediately instead of waiting for a start command.
    pub autostart: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub tick: u64,
    pub running: bool,
    pub ended: bool,
    pub subscribers: usize,
    pub queued_snapshots: usize,
    pub dropped_snapshots: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub action: &'static str,
    pub message: &'static str,
    pub running: bool,
    pub ended: bool,
}

pub fn router(handle: Arc<SimHandle>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/regions", get(regions))
        .route("/api/state", get(state))
        .route("/api/control/:action", post(control))
        .route("/api/events", get(stream_events))
        .route("/ws", get(ws::ws_handler))
        .with_state(handle)
}

pub async fn run(handle: Arc<SimHandle>, config: WebServerConfig) -> Result<()> {
    let tasks = BridgeTasks::spawn(handle.clone());
    if config.autostart {
        handle.start().await?;
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "worldsim server listening");

    axum::serve(listener, router(handle))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown().await;
    info!("worldsim server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

async fn status(State(handle): State<Arc<SimHandle>>) -> Json<StatusResponse> {
    let (running, ended, tick) = handle.status().await;
    let pipeline = handle.pipeline();
    Json(StatusResponse {
        tick,
        running,
        ended,
        subscribers: pipeline.subscriber_count(),
        queued_snapshots: pipeline.queue().len(),
        dropped_snapshots: pipeline.queue().dropped(),
        started_at: handle.started_at(),
    })
}

async fn regions(State(handle): State<Arc<SimHandle>>) -> Json<Vec<RegionListing>> {
    Json(handle.regions().await)
}

async fn state(State(handle): State<Arc<SimHandle>>) -> Json<WorldSnapshot> {
    Json(handle.snapshot().await)
}

async fn control(
    State(handle): State<Arc<SimHandle>>,
    Path(action): Path<String>,
) -> Result<Response, ControlError> {
    let action: ControlAction = action.parse()?;
    let outcome = handle.control(action).await?;
    let (running, ended, _) = handle.status().await;
    Ok(Json(ControlResponse {
        success: true,
        action: action.as_str(),
        message: outcome.message(),
        running,
        ended,
    })
    .into_response())
}

async fn stream_events(
    State(handle): State<Arc<SimHandle>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (_, rx) = handle.pipeline().subscribe();
    let stream = ReceiverStream::new(rx).map(|frame| Ok(Event::default().data(frame.as_ref())));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
