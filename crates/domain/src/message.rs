use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, MessageText, Timestamp};

/// 已持久化的聊天消息。
///
/// `conversation_id` 与 `sender` 保留客户端给出的字符串形式，
/// 实时通道不会对它们做身份校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: String,
    pub sender: String,
    pub text: MessageText,
    #[serde(rename = "createAt")]
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: impl Into<String>,
        sender: impl Into<String>,
        text: MessageText,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id: conversation_id.into(),
            sender: sender.into(),
            text,
            created_at,
        }
    }
}
