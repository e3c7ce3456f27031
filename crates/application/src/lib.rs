//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例：消息存储抽象、时钟，
//! 以及把新消息扇出给所有在线连接的广播中心。

pub mod clock;
pub mod error;
pub mod events;
pub mod hub;
pub mod repository;

pub use clock::{Clock, ZonedClock};
pub use error::ApplicationError;
pub use events::{ClientEvent, Delivery, ErrorPayload, SendMessagePayload, ServerEvent};
pub use hub::{ChatHub, ClientId, ClientSession};
pub use repository::{memory::MemoryMessageStore, MessageStore};
