use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::user::UserSummary;
use crate::value_objects::{ConversationId, Timestamp, UserId};

/// 两个用户之间的会话，加入后成员可以多于两人。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub members: Vec<UserSummary>,
    #[serde(rename = "createAt")]
    pub created_at: Timestamp,
}

impl Conversation {
    pub fn open_pair(
        id: ConversationId,
        initiator: UserSummary,
        recipient: UserSummary,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if initiator.id == recipient.id {
            return Err(DomainError::InvalidRecipient);
        }
        Ok(Self {
            id,
            members: vec![initiator, recipient],
            created_at: now,
        })
    }

    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|member| member.id == user_id)
    }

    /// 加入会话，已是成员时不做任何改变
    pub fn add_member(&mut self, member: UserSummary) -> bool {
        if self.has_member(member.id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// 从 `viewer` 的角度看到的对方成员
    pub fn counterpart(&self, viewer: UserId) -> Option<&UserSummary> {
        self.members
            .iter()
            .find(|member| member.id != viewer)
            .or_else(|| self.members.first())
    }
}
