use async_trait::async_trait;
use domain::{Message, NewMessage, RepositoryError};

/// 追加写入的消息日志
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    // 持久化后返回带 id 的消息，返回前必须已提交
    async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    // 按 id 升序返回全部消息
    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError>;
}

pub mod memory {
    use super::*;
    use domain::MessageId;
    use tokio::sync::RwLock;

    /// 进程内消息日志，用于测试和不落盘运行
    #[derive(Default)]
    pub struct MemoryMessageStore {
        messages: RwLock<Vec<Message>>,
    }

    impl MemoryMessageStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl MessageStore for MemoryMessageStore {
        async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError> {
            let mut messages = self.messages.write().await;
            let id = MessageId::new(messages.len() as i64 + 1);
            let stored = message.into_message(id);
            messages.push(stored.clone());
            Ok(stored)
        }

        async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
            Ok(self.messages.read().await.clone())
        }
    }
}
