use std::sync::Arc;

use domain::{Conversation, ConversationId, DomainError, UserId};

use crate::{
    clock::Clock,
    dto::ConversationView,
    error::ApplicationError,
    repository::{ConversationRepository, MessageRepository, UserRepository},
};

pub struct ConversationServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConversationService {
    deps: ConversationServiceDependencies,
}

impl ConversationService {
    pub fn new(deps: ConversationServiceDependencies) -> Self {
        Self { deps }
    }

    /// 打开与 `recipient_id` 的会话，已存在时直接返回
    pub async fn open(
        &self,
        caller: UserId,
        recipient_id: UserId,
    ) -> Result<ConversationView, ApplicationError> {
        if caller == recipient_id {
            return Err(DomainError::InvalidRecipient.into());
        }

        if let Some(existing) = self
            .deps
            .conversation_repository
            .find_by_pair(caller, recipient_id)
            .await?
        {
            return self.view(existing, caller).await;
        }

        let recipient = self
            .deps
            .user_repository
            .find_by_id(recipient_id)
            .await?
            .ok_or(DomainError::InvalidRecipient)?;
        let initiator = self
            .deps
            .user_repository
            .find_by_id(caller)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let conversation = Conversation::open_pair(
            ConversationId::generate(),
            initiator.summary(),
            recipient.summary(),
            self.deps.clock.now(),
        )?;
        let stored = self
            .deps
            .conversation_repository
            .create(conversation)
            .await?;

        tracing::info!(
            conversation_id = %stored.id,
            user_id = %caller,
            recipient_id = %recipient_id,
            "创建会话"
        );

        self.view(stored, caller).await
    }

    pub async fn join(
        &self,
        caller: UserId,
        conversation_id: ConversationId,
    ) -> Result<ConversationView, ApplicationError> {
        let member = self
            .deps
            .user_repository
            .find_by_id(caller)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        if self
            .deps
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .is_none()
        {
            return Err(DomainError::ConversationNotFound.into());
        }

        let conversation = self
            .deps
            .conversation_repository
            .add_member(conversation_id, member.summary())
            .await?;
        self.view(conversation, caller).await
    }

    pub async fn list_for_user(
        &self,
        caller: UserId,
    ) -> Result<Vec<ConversationView>, ApplicationError> {
        let conversations = self
            .deps
            .conversation_repository
            .find_by_member(caller)
            .await?;

        let mut views = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            views.push(self.view(conversation, caller).await?);
        }
        Ok(views)
    }

    async fn view(
        &self,
        conversation: Conversation,
        viewer: UserId,
    ) -> Result<ConversationView, ApplicationError> {
        let latest = self
            .deps
            .message_repository
            .latest(&conversation.id.to_string())
            .await?;
        Ok(ConversationView::new(conversation, viewer, latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::{
        InMemoryConversationRepository, InMemoryMessageRepository, InMemoryUserRepository,
    };
    use chrono::Utc;
    use domain::{Message, MessageId, MessageText, PasswordHash, User, Username};

    struct Fixture {
        service: ConversationService,
        users: Arc<InMemoryUserRepository>,
        messages: Arc<InMemoryMessageRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let service = ConversationService::new(ConversationServiceDependencies {
            conversation_repository: Arc::new(InMemoryConversationRepository::new()),
            user_repository: users.clone(),
            message_repository: messages.clone(),
            clock: Arc::new(SystemClock),
        });
        Fixture {
            service,
            users,
            messages,
        }
    }

    async fn user(fixture: &Fixture, name: &str) -> User {
        let user = User::register(
            UserId::generate(),
            Username::parse(name).unwrap(),
            PasswordHash::new("hash").unwrap(),
            "",
            Utc::now(),
        );
        fixture.users.create(user).await.unwrap()
    }

    #[tokio::test]
    async fn open_is_idempotent_per_pair() {
        let fixture = fixture();
        let alice = user(&fixture, "alice").await;
        let bob = user(&fixture, "bob").await;

        let first = fixture.service.open(alice.id, bob.id).await.unwrap();
        let again = fixture.service.open(bob.id, alice.id).await.unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.recipient.unwrap().id, bob.id);
        assert_eq!(again.recipient.unwrap().id, alice.id);
        assert!(first.latest_message.is_none());
    }

    #[tokio::test]
    async fn invalid_recipients_are_rejected() {
        let fixture = fixture();
        let alice = user(&fixture, "alice").await;

        let with_self = fixture.service.open(alice.id, alice.id).await.unwrap_err();
        let with_ghost = fixture
            .service
            .open(alice.id, UserId::generate())
            .await
            .unwrap_err();

        for err in [with_self, with_ghost] {
            assert!(matches!(
                err,
                ApplicationError::Domain(DomainError::InvalidRecipient)
            ));
        }
    }

    #[tokio::test]
    async fn join_adds_member_once() {
        let fixture = fixture();
        let alice = user(&fixture, "alice").await;
        let bob = user(&fixture, "bob").await;
        let carol = user(&fixture, "carol").await;
        let conversation = fixture.service.open(alice.id, bob.id).await.unwrap();

        let joined = fixture.service.join(carol.id, conversation.id).await.unwrap();
        let rejoined = fixture.service.join(carol.id, conversation.id).await.unwrap();
        assert_eq!(joined.members.len(), 3);
        assert_eq!(rejoined.members.len(), 3);

        let missing = fixture
            .service
            .join(carol.id, ConversationId::generate())
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            ApplicationError::Domain(DomainError::ConversationNotFound)
        ));
    }

    #[tokio::test]
    async fn listing_includes_latest_message() {
        let fixture = fixture();
        let alice = user(&fixture, "alice").await;
        let bob = user(&fixture, "bob").await;
        let conversation = fixture.service.open(alice.id, bob.id).await.unwrap();

        let message = Message::new(
            MessageId::generate(),
            conversation.id.to_string(),
            alice.id.to_string(),
            MessageText::new("hello bob").unwrap(),
            Utc::now(),
        );
        fixture.messages.create(message.clone()).await.unwrap();

        let views = fixture.service.list_for_user(bob.id).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].latest_message, Some(message));
        assert_eq!(views[0].recipient.as_ref().unwrap().id, alice.id);
    }
}
