#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{ChatHub, Clock, MemoryMessageStore, ZonedClock};
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState, Authenticator, JwtConfig, JwtService};

pub const SHARED_PASSWORD: &str = "test-shared-password";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn build_state() -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(ZonedClock::from_offset_minutes(210).expect("offset"));
    let hub = Arc::new(ChatHub::new(Arc::new(MemoryMessageStore::new()), clock));
    let jwt_service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-integration".to_string(),
        expiration_hours: 24,
    });

    AppState::new(hub, Arc::new(Authenticator::new(SHARED_PASSWORD, jwt_service)))
}

pub fn build_router() -> Router {
    router(build_state())
}

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = build_router();

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn login(&self, username: &str) -> String {
        let response: Value = reqwest::Client::new()
            .post(self.http("/api/v1/auth/login"))
            .json(&serde_json::json!({"username": username, "password": SHARED_PASSWORD}))
            .send()
            .await
            .expect("login request")
            .json()
            .await
            .expect("login json");
        response["token"].as_str().expect("token").to_owned()
    }

    /// 连接并等待注册完成（用 ping/pong 同步）
    pub async fn connect(&self, token: Option<&str>) -> WsClient {
        let url = match token {
            Some(token) => format!("ws://{}/api/v1/ws?token={}", self.addr, token),
            None => format!("ws://{}/api/v1/ws", self.addr),
        };
        let (mut ws, _) = connect_async(url).await.expect("ws connect");
        emit(&mut ws, serde_json::json!({"event": "ping"})).await;
        let pong = next_event(&mut ws).await;
        assert_eq!(pong["event"], "pong");
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn emit(ws: &mut WsClient, event: Value) {
    ws.send(TungsteniteMessage::Text(event.to_string().into()))
        .await
        .expect("ws send");
}

pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("ws error");
        if let TungsteniteMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("event json");
        }
    }
}

/// 在给定时间内没有收到任何文本帧
pub async fn assert_silent(ws: &mut WsClient) {
    if let Ok(Some(Ok(TungsteniteMessage::Text(text)))) =
        timeout(Duration::from_millis(200), ws.next()).await
    {
        panic!("unexpected event: {}", text.as_str());
    }
}
