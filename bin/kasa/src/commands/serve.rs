use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Deserialize;
use tracing::{info, warn};

use kasa_agent::{agent_card, AgentCard, RequestContext, RequestDispatcher};
use kasa_core::ChannelSink;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<RequestDispatcher>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest {
    message: String,
    #[serde(default)]
    context_id: Option<String>,
}

/// Serve the agent over HTTP: the agent card at `GET /card`, and
/// `POST /message` streaming one task's events as SSE frames.
pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let dispatcher = Arc::new(RequestDispatcher::from_config(&config)?);
    let state = AppState { dispatcher };

    let app = Router::new()
        .route("/card", get(card))
        .route("/message", post(message))
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    info!(addr = %addr, "Starting kasa server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn card() -> Json<AgentCard> {
    Json(agent_card())
}

async fn message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let ctx = RequestContext::fresh(request.context_id.as_deref());
    let (sink, rx) = ChannelSink::pair(32);

    info!(task_id = %ctx.task_id, context_id = %ctx.context_id, "Message accepted");

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.dispatch(&request.message, &ctx, &sink).await {
            warn!(task_id = %ctx.task_id, error = %e, "Dispatch failed");
        }
    });

    // The channel closes once the dispatcher drops its sink, which ends the
    // SSE stream after the final event.
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let data = serde_json::to_string(&event).unwrap_or_default();
        Some((Ok(SseEvent::default().data(data)), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
