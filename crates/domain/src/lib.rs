//! 群聊系统核心领域模型
//!
//! 只有一个实体：追加写入的聊天消息，以及相关的值对象和错误类型。

pub mod errors;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use message::*;
pub use value_objects::*;
