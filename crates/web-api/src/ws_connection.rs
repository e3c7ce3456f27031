use std::sync::Arc;

use application::{ChatHub, ClientEvent, ClientId, ClientSession, ServerEvent};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};

/// WebSocket 连接
///
/// 封装单个连接的生命周期：
/// - 握手后在广播中心注册
/// - 发送任务把广播中心推来的事件写入 socket
/// - 接收任务解析客户端帧并交给广播中心处理
/// - 任一方向结束后注销
pub struct WebSocketConnection {
    socket: WebSocket,
    hub: Arc<ChatHub>,
    session: ClientSession,
}

impl WebSocketConnection {
    pub async fn accept(socket: WebSocket, hub: Arc<ChatHub>, identity: Option<&str>) -> Self {
        let session = hub.connect(identity).await;
        tracing::info!(
            client_id = %session.client_id,
            username = %session.username,
            "WebSocket 连接已建立"
        );

        Self {
            socket,
            hub,
            session,
        }
    }

    /// 运行连接主循环，直到任一方向断开
    pub async fn run(self) {
        let Self {
            socket,
            hub,
            session,
        } = self;
        let ClientSession {
            client_id,
            mut events,
            ..
        } = session;

        let (mut sender, mut incoming) = socket.split();

        let mut send_task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let payload = match event.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    tracing::warn!(client_id = %client_id, "Failed to send text message");
                    break;
                }
            }
        });

        let recv_hub = hub.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                match message {
                    WsMessage::Text(text) => {
                        Self::handle_text(&recv_hub, client_id, text.as_str()).await;
                    }
                    WsMessage::Close(_) => {
                        tracing::debug!(client_id = %client_id, "client closed connection");
                        break;
                    }
                    WsMessage::Binary(_) => {
                        tracing::debug!(client_id = %client_id, "binary frame ignored");
                    }
                    WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        hub.disconnect(client_id).await;
        tracing::info!(client_id = %client_id, "WebSocket 连接已清理");
    }

    async fn handle_text(hub: &ChatHub, client_id: ClientId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => hub.dispatch(client_id, event).await,
            Err(err) => {
                tracing::warn!(client_id = %client_id, error = %err, "malformed client frame");
                hub.notify(
                    client_id,
                    ServerEvent::error("BAD_REQUEST", format!("invalid event: {}", err)),
                )
                .await;
            }
        }
    }
}
