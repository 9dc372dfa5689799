//! HTTP and WebSocket surface of an actibourse session.
//!
//! Observers connect to `/ws`, receive the full state immediately, then every
//! update as it happens; commands travel over the same socket or via
//! `POST /command`. `/state` serves a one-off snapshot. All command sources
//! go through the same [`Session::apply`] path.

pub mod scheduler;
pub mod session;

use std::sync::Arc;

use actibourse_types::api::{Command, TransactionError, Update};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub use session::Session;

pub struct Api {
    session: Session,
}

impl Api {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn router(&self) -> Router {
        // Boards and control panels are served from anywhere on the local
        // network, so CORS stays permissive.
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(50)
                .burst_size(200)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .unwrap(),
        );

        Router::new()
            .route("/healthz", get(healthz))
            .route("/state", get(state_snapshot))
            .route("/command", post(command))
            .route("/ws", get(ws_upgrade))
            .layer(cors)
            .layer(GovernorLayer {
                config: governor_conf,
            })
            .with_state(self.session.clone())
    }
}

#[derive(Serialize)]
struct CommandReply {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<Update>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Command rejection as an HTTP response.
struct ApiError(TransactionError);

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            TransactionError::UnknownTeam(_) | TransactionError::UnknownStock(_) => {
                (StatusCode::NOT_FOUND, "unknown_reference")
            }
            TransactionError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "invalid_quantity"),
            TransactionError::InsufficientFunds { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
            }
            TransactionError::InsufficientHoldings { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_holdings")
            }
        };
        let body = ErrorBody {
            error,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn state_snapshot(AxumState(session): AxumState<Session>) -> impl IntoResponse {
    Json(session.snapshot())
}

async fn command(
    AxumState(session): AxumState<Session>,
    Json(command): Json<Command>,
) -> Result<Json<CommandReply>, ApiError> {
    let update = session.apply(command)?;
    Ok(Json(CommandReply { ok: true, update }))
}

async fn ws_upgrade(
    AxumState(session): AxumState<Session>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, session))
}

async fn handle_ws(socket: WebSocket, session: Session) {
    info!("observer connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = session.subscribe();

    // New observers get the full authoritative state before anything else.
    let hello = Update::State {
        state: session.snapshot(),
    };
    if send_update(&mut sender, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_ws_command(&session, &mut sender, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(%err, "websocket error");
                        break;
                    }
                    _ => {}
                }
            }
            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        if send_update(&mut sender, &update).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "observer lagged behind the update stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
    info!("observer disconnected");
    let _ = sender.close().await;
}

/// Parse and apply one inbound socket command; rejections go back only to the
/// sender, broadcasts to everyone happen inside the session.
async fn handle_ws_command(
    session: &Session,
    sender: &mut SplitSink<WebSocket, Message>,
    text: &str,
) {
    let command = match serde_json::from_str::<Command>(text) {
        Ok(command) => command,
        Err(err) => {
            warn!(%err, "unparseable command");
            let rejection = Update::Rejected {
                message: format!("unparseable command: {err}"),
            };
            let _ = send_update(sender, &rejection).await;
            return;
        }
    };
    match session.apply(command) {
        Ok(Some(reply)) => {
            let _ = send_update(sender, &reply).await;
        }
        Ok(None) => {}
        Err(err) => {
            let rejection = Update::Rejected {
                message: err.to_string(),
            };
            let _ = send_update(sender, &rejection).await;
        }
    }
}

async fn send_update(
    sender: &mut SplitSink<WebSocket, Message>,
    update: &Update,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(update) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(%err, "failed to encode update");
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await
}
