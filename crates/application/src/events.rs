//! WebSocket 上传输的事件
//!
//! 帧格式为 `{"event": "<name>", "data": <payload>}`。
//! 入站帧只要求 `event` 合法；`data` 缺失、为 null 或字段类型不对时都按宽松规则处理。

use domain::{Message, MessageId};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::hub::ClientId;

/// 客户端发来的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage(SendMessagePayload),
    LoadHistory,
    Ping,
}

impl ClientEvent {
    const NAMES: &'static [&'static str] = &["send_message", "load_history", "ping"];

    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    /// 会写入消息日志的事件需要在发送锁内处理
    pub fn appends(&self) -> bool {
        matches!(self, ClientEvent::SendMessage(_))
    }
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl<'de> Deserialize<'de> for ClientEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let frame = RawFrame::deserialize(deserializer)?;
        match frame.event.as_str() {
            "send_message" => Ok(ClientEvent::SendMessage(SendMessagePayload::from_value(
                &frame.data,
            ))),
            // load_history / ping 不带负载，传了也忽略
            "load_history" => Ok(ClientEvent::LoadHistory),
            "ping" => Ok(ClientEvent::Ping),
            other => Err(de::Error::unknown_variant(other, Self::NAMES)),
        }
    }
}

/// `send_message` 的负载。缺失字段按宽松规则处理：没有文本视为空串，没有回复目标视为 null。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SendMessagePayload {
    pub text: Option<String>,
    pub parent_id: Option<MessageId>,
}

impl SendMessagePayload {
    pub fn new(text: impl Into<String>, parent_id: Option<MessageId>) -> Self {
        Self {
            text: Some(text.into()),
            parent_id,
        }
    }

    /// 逐字段读取，类型不符的字段当作缺失
    fn from_value(data: &Value) -> Self {
        Self {
            text: data.get("text").and_then(Value::as_str).map(str::to_owned),
            parent_id: data.get("parent_id").and_then(Value::as_i64).map(MessageId::new),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// 服务端推送的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(Message),
    History(Vec<Message>),
    Error(ErrorPayload),
    Pong,
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload {
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// 处理一个入站事件后产生的投递动作
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// 发给所有在线连接（包括发送者）
    Broadcast(ServerEvent),
    /// 只发给一个连接
    Unicast { to: ClientId, event: ServerEvent },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_send_message_with_parent() {
        let event =
            ClientEvent::parse(r#"{"event":"send_message","data":{"text":"hi","parent_id":3}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::SendMessage(SendMessagePayload::new("hi", Some(MessageId::new(3))))
        );
    }

    #[test]
    fn missing_fields_are_permissive() {
        let event = ClientEvent::parse(r#"{"event":"send_message","data":{}}"#).unwrap();
        let ClientEvent::SendMessage(payload) = event else {
            panic!("expected send_message");
        };
        assert_eq!(payload.text(), "");
        assert_eq!(payload.parent_id, None);

        let event = ClientEvent::parse(
            r#"{"event":"send_message","data":{"text":null,"parent_id":null}}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::SendMessage(p) if p.text().is_empty()));
    }

    #[test]
    fn parses_load_history_without_payload() {
        let event = ClientEvent::parse(r#"{"event":"load_history"}"#).unwrap();
        assert_eq!(event, ClientEvent::LoadHistory);
        assert!(!event.appends());
    }

    #[test]
    fn missing_or_null_data_is_an_empty_send() {
        for frame in [
            r#"{"event":"send_message"}"#,
            r#"{"event":"send_message","data":null}"#,
            r#"{"event":"send_message","data":"hello"}"#,
        ] {
            let event = ClientEvent::parse(frame).unwrap();
            assert_eq!(event, ClientEvent::SendMessage(SendMessagePayload::default()), "{frame}");
        }
    }

    #[test]
    fn mistyped_fields_are_treated_as_missing() {
        let event = ClientEvent::parse(
            r#"{"event":"send_message","data":{"text":"hi","parent_id":"seven"}}"#,
        )
        .unwrap();
        assert_eq!(event, ClientEvent::SendMessage(SendMessagePayload::new("hi", None)));

        let event =
            ClientEvent::parse(r#"{"event":"send_message","data":{"text":42}}"#).unwrap();
        assert!(matches!(event, ClientEvent::SendMessage(p) if p.text().is_empty()));
    }

    #[test]
    fn payload_on_load_history_and_ping_is_ignored() {
        assert_eq!(
            ClientEvent::parse(r#"{"event":"load_history","data":{}}"#).unwrap(),
            ClientEvent::LoadHistory
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"load_history","data":null}"#).unwrap(),
            ClientEvent::LoadHistory
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"ping","data":[1,2]}"#).unwrap(),
            ClientEvent::Ping
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(ClientEvent::parse(r#"{"event":"delete_message","data":{"id":1}}"#).is_err());
        assert!(ClientEvent::parse("not json").is_err());
        assert!(ClientEvent::parse(r#"{"data":{"text":"no event"}}"#).is_err());
    }

    #[test]
    fn new_message_wire_shape() {
        let event = ServerEvent::NewMessage(Message {
            id: MessageId::new(1),
            username: "alice".into(),
            text: "hello".into(),
            timestamp: "2024-01-01 12:00:00".into(),
            parent_id: None,
        });

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "new_message",
                "data": {
                    "id": 1,
                    "username": "alice",
                    "text": "hello",
                    "timestamp": "2024-01-01 12:00:00",
                    "parent_id": null
                }
            })
        );
    }

    #[test]
    fn history_is_an_ordered_array() {
        let event = ServerEvent::History(vec![]);
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "history", "data": []}));
    }
}
