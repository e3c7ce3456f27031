//! 基础设施层实现。
//!
//! 提供 SQLite 消息日志，以及按配置组装存储的入口。

pub mod builder;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureError};
pub use repository::{create_sqlite_pool, SqliteMessageStore};
