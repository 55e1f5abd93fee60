use std::sync::Arc;

use domain::{ConversationId, DomainError, Message, MessageId, MessageText, UserId};

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{ConversationRepository, MessageRepository, Pagination},
};

pub struct MessageServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 通过 HTTP 接口收发消息，不经过实时通道推送
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn send(
        &self,
        caller: UserId,
        conversation_id: ConversationId,
        text: String,
    ) -> Result<Message, ApplicationError> {
        let text = MessageText::new(text)?;
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;
        if !conversation.has_member(caller) {
            return Err(ApplicationError::Authorization);
        }

        let message = Message::new(
            MessageId::generate(),
            conversation_id.to_string(),
            caller.to_string(),
            text,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.create(message).await?;
        Ok(stored)
    }

    pub async fn list(&self, conversation_id: ConversationId) -> Result<Vec<Message>, ApplicationError> {
        let messages = self
            .deps
            .message_repository
            .list_by_conversation(&conversation_id.to_string())
            .await?;
        Ok(messages)
    }

    pub async fn paginate(
        &self,
        conversation_id: ConversationId,
        pagination: Pagination,
    ) -> Result<Vec<Message>, ApplicationError> {
        let messages = self
            .deps
            .message_repository
            .paginate(&conversation_id.to_string(), pagination)
            .await?;
        Ok(messages)
    }
}
