use domain::{Conversation, ConversationId, Message, Timestamp, User, UserId, UserSummary};
use serde::{Deserialize, Serialize};

/// 对外暴露的用户信息，不含密码哈希
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    pub username: String,
    pub profile_picture: String,
    #[serde(rename = "createAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updateAt")]
    pub updated_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.as_str().to_owned(),
            profile_picture: user.profile_picture.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 会话列表中的一项，附带最新消息和对方成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: ConversationId,
    pub members: Vec<UserSummary>,
    #[serde(rename = "createAt")]
    pub created_at: Timestamp,
    pub latest_message: Option<Message>,
    pub recipient: Option<UserSummary>,
}

impl ConversationView {
    pub fn new(conversation: Conversation, viewer: UserId, latest_message: Option<Message>) -> Self {
        let recipient = conversation.counterpart(viewer).cloned();
        Self {
            id: conversation.id,
            members: conversation.members,
            created_at: conversation.created_at,
            latest_message,
            recipient,
        }
    }
}
