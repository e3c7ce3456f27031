use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 消息时间戳格式，例如 `2024-03-01 18:30:05`。
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 未登录连接使用的身份。
pub const ANONYMOUS: &str = "Anonymous";

/// 消息唯一标识，由存储在写入时分配，严格递增。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MessageId> for i64 {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

/// 发送者身份。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument("username", "cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_owned())
    }

    /// 握手时解析身份：缺失或空白时退化为匿名身份。
    pub fn or_anonymous(value: Option<&str>) -> Self {
        value
            .and_then(|name| Self::parse(name).ok())
            .unwrap_or_else(Self::anonymous)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 去除首尾空白后非空的消息正文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageText(String);

impl MessageText {
    /// 空白文本返回 `None`，调用方静默丢弃。
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        let text = MessageText::parse("  hello there \n").unwrap();
        assert_eq!(text.as_str(), "hello there");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(MessageText::parse("").is_none());
        assert!(MessageText::parse("   ").is_none());
        assert!(MessageText::parse("\t\n").is_none());
    }

    #[test]
    fn missing_identity_falls_back_to_anonymous() {
        assert_eq!(Username::or_anonymous(None).as_str(), "Anonymous");
        assert_eq!(Username::or_anonymous(Some("  ")).as_str(), "Anonymous");
        assert_eq!(Username::or_anonymous(Some(" alice ")).as_str(), "alice");
    }
}
