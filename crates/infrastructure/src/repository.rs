use std::str::FromStr;

use application::MessageStore;
use async_trait::async_trait;
use domain::{Message, MessageId, NewMessage, RepositoryError};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use tokio::sync::Mutex;

const CREATE_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT,
    text TEXT,
    timestamp TEXT,
    parent_id INTEGER
)
"#;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

/// 打开 SQLite 连接池，文件不存在时创建
pub async fn create_sqlite_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    username: Option<String>,
    text: Option<String>,
    timestamp: Option<String>,
    parent_id: Option<i64>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Message {
            id: MessageId::new(value.id),
            username: value.username.unwrap_or_default(),
            text: value.text.unwrap_or_default(),
            timestamp: value.timestamp.unwrap_or_default(),
            parent_id: value.parent_id.map(MessageId::new),
        }
    }
}

/// 基于 SQLite 的追加写入消息日志
pub struct SqliteMessageStore {
    pool: SqlitePool,
    // 单写者：id 分配与提交串行化
    writer: Mutex<()>,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Mutex::new(()),
        }
    }

    /// 建表（不存在时）后返回存储
    pub async fn open(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(CREATE_MESSAGES_TABLE).execute(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let _writer = self.writer.lock().await;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO messages (username, text, timestamp, parent_id)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(message.username.as_str())
        .bind(message.text.as_str())
        .bind(&message.timestamp)
        .bind(message.parent_id.map(i64::from))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(message.into_message(MessageId::new(id)))
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, username, text, timestamp, parent_id
            FROM messages
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Message::from).collect())
    }
}
