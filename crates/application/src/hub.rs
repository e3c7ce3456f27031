//! 广播中心
//!
//! 维护在线连接集合：新消息写入日志后扇出给所有连接，历史消息只回给请求者。
//! 处理逻辑（[`ChatHub::handle`]）只计算投递动作，真正的投递在 [`ChatHub::dispatch`] 中完成。
//! 只有经 `dispatch` 投递的新消息才保证所有连接按 id 顺序收到。
//!
//! 每个连接的出站队列有上限；队列满的连接视为掉队，直接注销。

use std::{collections::HashMap, fmt, sync::Arc};

use domain::{MessageText, NewMessage, Username};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::{ClientEvent, Delivery, SendMessagePayload, ServerEvent},
    repository::MessageStore,
};

/// 单个连接出站队列的默认容量
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

/// 连接唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 注册成功后交给传输层的连接上下文
#[derive(Debug)]
pub struct ClientSession {
    pub client_id: ClientId,
    pub username: Username,
    pub events: mpsc::Receiver<ServerEvent>,
}

struct ClientHandle {
    username: Username,
    sender: mpsc::Sender<ServerEvent>,
}

pub struct ChatHub {
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    clients: RwLock<HashMap<ClientId, ClientHandle>>,
    // 追加与扇出在同一把锁内完成，所有连接按 id 顺序看到新消息
    send_lock: Mutex<()>,
    queue_capacity: usize,
}

impl ChatHub {
    pub fn new(store: Arc<dyn MessageStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            clients: RwLock::new(HashMap::new()),
            send_lock: Mutex::new(()),
            queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
        }
    }

    /// 设置每个连接出站队列的容量（至少为 1）
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// 注册连接。身份在握手时确定，缺失时使用 `Anonymous`。不会自动推送历史。
    pub async fn connect(&self, identity: Option<&str>) -> ClientSession {
        let client_id = ClientId::new();
        let username = Username::or_anonymous(identity);
        let (sender, events) = mpsc::channel(self.queue_capacity);

        self.clients.write().await.insert(
            client_id,
            ClientHandle {
                username: username.clone(),
                sender,
            },
        );

        tracing::info!(client_id = %client_id, username = %username, "client connected");

        ClientSession {
            client_id,
            username,
            events,
        }
    }

    /// 注销连接，之后不再收到任何广播
    pub async fn disconnect(&self, client_id: ClientId) {
        if self.clients.write().await.remove(&client_id).is_some() {
            tracing::info!(client_id = %client_id, "client disconnected");
        }
    }

    pub async fn connected_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_connected(&self, client_id: ClientId) -> bool {
        self.clients.read().await.contains_key(&client_id)
    }

    /// 全部历史消息，按 id 升序
    pub async fn history(&self) -> Result<Vec<domain::Message>, ApplicationError> {
        Ok(self.store.list_all().await?)
    }

    /// 计算一个入站事件产生的投递动作，不做投递。
    ///
    /// 写入日志时持有发送锁，id 分配与其他发送串行；投递顺序由调用方负责。
    pub async fn handle(
        &self,
        client_id: ClientId,
        event: ClientEvent,
    ) -> Result<Vec<Delivery>, ApplicationError> {
        let _guard = self.lock_for(&event).await;
        self.evaluate(client_id, event).await
    }

    async fn lock_for(&self, event: &ClientEvent) -> Option<MutexGuard<'_, ()>> {
        if event.appends() {
            Some(self.send_lock.lock().await)
        } else {
            None
        }
    }

    async fn evaluate(
        &self,
        client_id: ClientId,
        event: ClientEvent,
    ) -> Result<Vec<Delivery>, ApplicationError> {
        let username = self
            .clients
            .read()
            .await
            .get(&client_id)
            .map(|handle| handle.username.clone())
            .ok_or(ApplicationError::UnknownClient(client_id))?;

        match event {
            ClientEvent::SendMessage(payload) => self.handle_send(username, payload).await,
            ClientEvent::LoadHistory => {
                let messages = self.store.list_all().await?;
                Ok(vec![Delivery::Unicast {
                    to: client_id,
                    event: ServerEvent::History(messages),
                }])
            }
            ClientEvent::Ping => Ok(vec![Delivery::Unicast {
                to: client_id,
                event: ServerEvent::Pong,
            }]),
        }
    }

    async fn handle_send(
        &self,
        username: Username,
        payload: SendMessagePayload,
    ) -> Result<Vec<Delivery>, ApplicationError> {
        let Some(text) = MessageText::parse(payload.text()) else {
            tracing::debug!(username = %username, "dropping blank message");
            return Ok(Vec::new());
        };

        let draft = NewMessage::new(username, text, self.clock.timestamp(), payload.parent_id);
        let stored = self.store.append(draft).await?;

        tracing::debug!(message_id = %stored.id, username = %stored.username, "message stored");
        Ok(vec![Delivery::Broadcast(ServerEvent::NewMessage(stored))])
    }

    /// 处理并投递一个入站事件。失败只通知发送者，不影响其他连接。
    pub async fn dispatch(&self, client_id: ClientId, event: ClientEvent) {
        let _guard = self.lock_for(&event).await;

        match self.evaluate(client_id, event).await {
            Ok(deliveries) => self.deliver(deliveries).await,
            Err(ApplicationError::UnknownClient(_)) => {
                tracing::warn!(client_id = %client_id, "event from unregistered client ignored");
            }
            Err(err) => {
                tracing::error!(client_id = %client_id, error = %err, "failed to handle client event");
                self.notify(
                    client_id,
                    ServerEvent::error("DELIVERY_FAILED", "message could not be delivered"),
                )
                .await;
            }
        }
    }

    /// 单播一个事件
    pub async fn notify(&self, client_id: ClientId, event: ServerEvent) {
        self.deliver(vec![Delivery::Unicast {
            to: client_id,
            event,
        }])
        .await;
    }

    async fn deliver(&self, deliveries: Vec<Delivery>) {
        if deliveries.is_empty() {
            return;
        }

        let mut lagging = Vec::new();
        {
            let clients = self.clients.read().await;
            for delivery in deliveries {
                match delivery {
                    Delivery::Broadcast(event) => {
                        for (client_id, handle) in clients.iter() {
                            if !Self::push(*client_id, handle, event.clone()) {
                                lagging.push(*client_id);
                            }
                        }
                    }
                    Delivery::Unicast { to, event } => match clients.get(&to) {
                        Some(handle) => {
                            if !Self::push(to, handle, event) {
                                lagging.push(to);
                            }
                        }
                        None => tracing::debug!(client_id = %to, "unicast target not connected"),
                    },
                }
            }
        }

        if lagging.is_empty() {
            return;
        }
        let mut clients = self.clients.write().await;
        for client_id in lagging {
            if clients.remove(&client_id).is_some() {
                tracing::warn!(client_id = %client_id, "client queue full, disconnecting");
            }
        }
    }

    /// 放入连接的出站队列；队列已满时返回 false
    fn push(client_id: ClientId, handle: &ClientHandle, event: ServerEvent) -> bool {
        match handle.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => false,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %client_id, "client channel closed");
                true
            }
        }
    }
}
