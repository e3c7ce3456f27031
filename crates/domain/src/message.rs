use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, MessageText, Username};

/// 已持久化的聊天消息。写入后不可修改、不可删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub username: String,
    pub text: String,
    pub timestamp: String,
    /// 回复的目标消息；不校验是否存在。
    pub parent_id: Option<MessageId>,
}

/// 尚未分配 id 的消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub username: Username,
    pub text: MessageText,
    pub timestamp: String,
    pub parent_id: Option<MessageId>,
}

impl NewMessage {
    pub fn new(
        username: Username,
        text: MessageText,
        timestamp: impl Into<String>,
        parent_id: Option<MessageId>,
    ) -> Self {
        Self {
            username,
            text,
            timestamp: timestamp.into(),
            parent_id,
        }
    }

    /// 存储分配 id 之后得到完整消息。
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            username: self.username.into_inner(),
            text: self.text.into_inner(),
            timestamp: self.timestamp,
            parent_id: self.parent_id,
        }
    }
}
