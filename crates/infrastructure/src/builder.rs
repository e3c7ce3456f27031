use std::sync::Arc;

use application::{MemoryMessageStore, MessageStore};
use config::DatabaseConfig;
use thiserror::Error;

use crate::repository::{create_sqlite_pool, SqliteMessageStore};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Infrastructure {
    pub message_store: Arc<dyn MessageStore>,
}

impl Infrastructure {
    /// 按配置选择存储：`memory` 使用进程内日志，其他地址视为 SQLite
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        let message_store: Arc<dyn MessageStore> = if config.is_memory() {
            tracing::warn!("using in-memory message store, history is lost on restart");
            Arc::new(MemoryMessageStore::new())
        } else {
            let pool = create_sqlite_pool(&config.url, config.max_connections).await?;
            Arc::new(SqliteMessageStore::open(pool).await?)
        };

        Ok(Self { message_store })
    }
}
