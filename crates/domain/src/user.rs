use serde::{Deserialize, Serialize};

use crate::value_objects::{PasswordHash, Timestamp, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub password: PasswordHash,
    pub profile_picture: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        password: PasswordHash,
        profile_picture: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            password,
            profile_picture: profile_picture.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 会话成员中保存的用户快照（不含密码）
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: Username,
    pub profile_picture: String,
}
