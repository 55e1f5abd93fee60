//! 实时通道消息定义
//!
//! 客户端与服务器之间通过 WebSocket 交换的 JSON 信封：
//! `{"event": "...", "message": ...}`。事件名在解码时即确定载荷结构，
//! 未知事件或结构不符的载荷直接解码失败；`addUser` 不看载荷。

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// 绑定到某个连接上的用户身份
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedUser {
    #[serde(rename = "id")]
    pub user_id: String,
    /// 每个连接实例唯一，同一用户的多个设备各不相同
    pub connection_token: String,
}

/// `sendMessage` 事件的载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub text: String,
}

/// 客户端发往服务器的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "message", rename_all = "camelCase")]
pub enum InboundEnvelope {
    /// 用户 ID 取自连接的查询参数而不是载荷
    AddUser,
    SendMessage(ChatMessagePayload),
}

impl InboundEnvelope {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let frame: serde_json::Value = serde_json::from_str(raw)?;
        // addUser 附带的载荷一律忽略
        if frame.get("event").and_then(serde_json::Value::as_str) == Some("addUser") {
            return Ok(Self::AddUser);
        }
        serde_json::from_value(frame)
    }
}

/// 服务器推送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "message")]
pub enum OutboundEnvelope {
    /// 当前在线用户列表
    #[serde(rename = "getUsers")]
    UserList(Vec<ConnectedUser>),
    /// 新消息
    #[serde(rename = "getMessage")]
    NewMessage(Message),
}

impl OutboundEnvelope {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
