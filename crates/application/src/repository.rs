use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, Message, RepositoryError, User, UserId, UserSummary, Username,
};

/// 分页参数，`page` 从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Result<Self, domain::DomainError> {
        if page == 0 {
            return Err(domain::DomainError::invalid_argument(
                "page",
                "must be at least 1",
            ));
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(domain::DomainError::invalid_argument(
                "limit",
                format!("must be between 1 and {}", Self::MAX_LIMIT),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 用户名唯一，冲突时返回 `RepositoryError::Conflict`
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError>;
    async fn find_by_id(&self, id: ConversationId)
        -> Result<Option<Conversation>, RepositoryError>;
    async fn find_by_member(&self, user_id: UserId) -> Result<Vec<Conversation>, RepositoryError>;
    /// 查找恰好包含这两个用户的会话
    async fn find_by_pair(
        &self,
        first: UserId,
        second: UserId,
    ) -> Result<Option<Conversation>, RepositoryError>;
    /// 幂等加入，返回更新后的会话
    async fn add_member(
        &self,
        id: ConversationId,
        member: UserSummary,
    ) -> Result<Conversation, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    /// 按时间正序返回全部消息
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, RepositoryError>;
    /// 按时间倒序分页
    async fn paginate(
        &self,
        conversation_id: &str,
        pagination: Pagination,
    ) -> Result<Vec<Message>, RepositoryError>;
    async fn latest(&self, conversation_id: &str) -> Result<Option<Message>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_one_based() {
        assert_eq!(Pagination::new(1, 20).unwrap().offset(), 0);
        assert_eq!(Pagination::new(3, 20).unwrap().offset(), 40);
        assert!(Pagination::new(0, 20).is_err());
        assert!(Pagination::new(1, 0).is_err());
        assert!(Pagination::new(1, Pagination::MAX_LIMIT + 1).is_err());
    }
}
