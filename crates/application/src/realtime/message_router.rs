use std::sync::Arc;

use domain::{ChatMessagePayload, Message, MessageId, MessageText, OutboundEnvelope};
use tracing::{debug, warn};

use super::delivery::{fan_out, DeliveryReport};
use super::error::RealtimeError;
use super::session_registry::SessionRegistry;
use crate::clock::Clock;
use crate::repository::MessageRepository;

/// 一次路由的结果
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub message: Message,
    pub persisted: bool,
    pub delivery: DeliveryReport,
}

/// 消息路由：写入与推送同时进行，推送不等待持久化完成
///
/// 不回显给发送者，也不做送达确认。
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            messages,
            clock,
        }
    }

    pub async fn route(&self, payload: ChatMessagePayload) -> Result<RouteOutcome, RealtimeError> {
        let ChatMessagePayload {
            conversation_id,
            sender_id,
            recipient_id,
            text,
        } = payload;

        // 实时通道不校验正文，空白消息照常保存和推送
        let message = Message::new(
            MessageId::generate(),
            conversation_id,
            sender_id,
            MessageText::verbatim(text),
            self.clock.now(),
        );

        // 写入放在独立任务中，连接断开也不会打断它
        let messages = Arc::clone(&self.messages);
        let stored = message.clone();
        let write = tokio::spawn(async move { messages.create(stored).await });

        let delivery = self.deliver(&message, &recipient_id).await;

        // 持久化失败不影响实时投递
        let persisted = match write.await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                warn!(
                    message_id = %message.id,
                    conversation_id = %message.conversation_id,
                    error = %err,
                    "消息持久化失败"
                );
                false
            }
            Err(err) => {
                warn!(message_id = %message.id, error = %err, "持久化任务异常退出");
                false
            }
        };

        Ok(RouteOutcome {
            message,
            persisted,
            delivery: delivery?,
        })
    }

    async fn deliver(
        &self,
        message: &Message,
        recipient_id: &str,
    ) -> Result<DeliveryReport, RealtimeError> {
        let sessions = self.registry.sessions_for_user(recipient_id).await;
        if sessions.is_empty() {
            debug!(recipient_id = %recipient_id, "接收者不在线，跳过实时投递");
            return Ok(DeliveryReport::default());
        }

        let frame = OutboundEnvelope::NewMessage(message.clone())
            .encode()
            .map_err(|err| RealtimeError::Delivery(err.to_string()))?;
        let delivery = fan_out(&sessions, &frame);
        debug!(
            message_id = %message.id,
            recipient_id = %recipient_id,
            delivered = delivery.delivered,
            "消息已投递"
        );
        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::InMemoryMessageRepository;
    use crate::realtime::Session;
    use crate::repository::{MockMessageRepository, Pagination};
    use async_trait::async_trait;
    use chrono::Utc;
    use domain::RepositoryError;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};
    use tokio::time::timeout;

    fn payload(recipient: &str, text: &str) -> ChatMessagePayload {
        ChatMessagePayload {
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            recipient_id: recipient.into(),
            text: text.into(),
        }
    }

    async fn online(registry: &SessionRegistry, sender: mpsc::Sender<String>, user_id: &str) {
        let session = Session::new(None, sender);
        registry.attach(&session).await;
        registry.register(&session, user_id).await.unwrap();
    }

    fn router(
        registry: &Arc<SessionRegistry>,
        messages: Arc<dyn MessageRepository>,
    ) -> MessageRouter {
        MessageRouter::new(
            Arc::clone(registry),
            messages,
            Arc::new(FixedClock(Utc::now())),
        )
    }

    #[tokio::test]
    async fn offline_recipient_still_persists() {
        let registry = Arc::new(SessionRegistry::new());
        let store = Arc::new(InMemoryMessageRepository::new());
        let router = router(&registry, store.clone());

        let outcome = router.route(payload("u2", "hi")).await.unwrap();

        assert!(outcome.persisted);
        assert_eq!(outcome.delivery.attempted(), 0);
        let stored = store.list_by_conversation("c1").await.unwrap();
        assert_eq!(stored, vec![outcome.message]);
    }

    #[tokio::test]
    async fn every_recipient_device_gets_one_identical_frame() {
        let registry = Arc::new(SessionRegistry::new());
        let router = router(&registry, Arc::new(InMemoryMessageRepository::new()));

        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);
        let (tx_sender, mut rx_sender) = mpsc::channel(16);
        online(&registry, tx_a, "u2").await;
        online(&registry, tx_b, "u2").await;
        online(&registry, tx_sender, "u1").await;

        let outcome = router.route(payload("u2", "hi")).await.unwrap();
        assert_eq!(outcome.delivery, DeliveryReport { delivered: 2, failed: 0 });

        let first = rx_a.try_recv().unwrap();
        let second = rx_b.try_recv().unwrap();
        assert_eq!(first, second);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_sender.try_recv().is_err());

        let frame: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(frame["event"], "getMessage");
        assert_eq!(frame["message"]["conversationId"], "c1");
        assert_eq!(frame["message"]["sender"], "u1");
        assert_eq!(frame["message"]["text"], "hi");
    }

    #[tokio::test]
    async fn persistence_failure_still_delivers() {
        let registry = Arc::new(SessionRegistry::new());
        let mut failing = MockMessageRepository::new();
        failing
            .expect_create()
            .times(1)
            .returning(|_| Err(RepositoryError::storage("database is down")));
        let router = router(&registry, Arc::new(failing));

        let (tx, mut rx) = mpsc::channel(16);
        online(&registry, tx, "u2").await;

        let outcome = router.route(payload("u2", "hi")).await.unwrap();
        assert!(!outcome.persisted);
        assert_eq!(outcome.delivery.delivered, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn blank_text_is_persisted_and_delivered() {
        let registry = Arc::new(SessionRegistry::new());
        let store = Arc::new(InMemoryMessageRepository::new());
        let router = router(&registry, store.clone());

        let (tx, mut rx) = mpsc::channel(16);
        online(&registry, tx, "u2").await;

        for text in ["", "   "] {
            let outcome = router.route(payload("u2", text)).await.unwrap();
            assert!(outcome.persisted);
            assert_eq!(outcome.delivery.delivered, 1);

            let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(frame["message"]["text"], text);
        }

        let stored = store.list_by_conversation("c1").await.unwrap();
        let texts: Vec<&str> = stored.iter().map(|message| message.text.as_str()).collect();
        assert_eq!(texts, ["", "   "]);
    }

    /// 写入被挂起，直到测试放行
    struct HeldRepository {
        gate: Arc<Notify>,
        inner: InMemoryMessageRepository,
    }

    #[async_trait]
    impl MessageRepository for HeldRepository {
        async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
            self.gate.notified().await;
            self.inner.create(message).await
        }

        async fn list_by_conversation(
            &self,
            conversation_id: &str,
        ) -> Result<Vec<Message>, RepositoryError> {
            self.inner.list_by_conversation(conversation_id).await
        }

        async fn paginate(
            &self,
            conversation_id: &str,
            pagination: Pagination,
        ) -> Result<Vec<Message>, RepositoryError> {
            self.inner.paginate(conversation_id, pagination).await
        }

        async fn latest(&self, conversation_id: &str) -> Result<Option<Message>, RepositoryError> {
            self.inner.latest(conversation_id).await
        }
    }

    #[tokio::test]
    async fn delivery_does_not_wait_for_the_write() {
        let registry = Arc::new(SessionRegistry::new());
        let gate = Arc::new(Notify::new());
        let router = router(
            &registry,
            Arc::new(HeldRepository {
                gate: Arc::clone(&gate),
                inner: InMemoryMessageRepository::new(),
            }),
        );

        let (tx, mut rx) = mpsc::channel(16);
        online(&registry, tx, "u2").await;

        let routing = tokio::spawn(async move { router.route(payload("u2", "hi")).await });

        let frame = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("delivered while the write is still pending")
            .unwrap();
        assert!(frame.contains("getMessage"));
        assert!(!routing.is_finished());

        gate.notify_one();
        let outcome = routing.await.unwrap().unwrap();
        assert!(outcome.persisted);
        assert_eq!(outcome.delivery.delivered, 1);
    }
}
