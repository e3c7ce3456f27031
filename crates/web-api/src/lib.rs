//! Web API 层。
//!
//! 提供 Axum 路由：登录换取令牌、WebSocket 聊天通道，以及历史消息查询。

mod auth;
mod error;
mod routes;
mod state;
mod ws_connection;

pub use auth::{Authenticator, Claims, JwtService, LoginResponse, INVALID_CREDENTIALS};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use ws_connection::WebSocketConnection;
