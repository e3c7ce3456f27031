use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use domain::Message;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{auth::LoginResponse, error::ApiError, state::AppState, ws_connection::WebSocketConnection};

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/messages", get(list_messages))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.authenticator.login(&payload.username, &payload.password) {
        Ok(response) => {
            tracing::info!(username = %response.username, "user logged in");
            Ok(Json(response))
        }
        Err(err) => {
            tracing::warn!(username = %payload.username.trim(), "login rejected");
            Err(err)
        }
    }
}

async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state.hub.history().await?;
    Ok(Json(messages))
}

// 没有令牌的连接以 Anonymous 身份加入；带了令牌但无效则拒绝升级
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let identity = match query.token.as_deref().filter(|token| !token.is_empty()) {
        Some(token) => Some(state.authenticator.identify(token).inspect_err(|_| {
            tracing::warn!("WebSocket upgrade rejected: invalid token");
        })?),
        None => None,
    };

    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        WebSocketConnection::accept(socket, hub, identity.as_deref())
            .await
            .run()
            .await;
    }))
}
