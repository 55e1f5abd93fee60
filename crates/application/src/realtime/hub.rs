use std::sync::Arc;

use config::RealtimeConfig;
use domain::{ChatMessagePayload, InboundEnvelope};
use tracing::{debug, info, warn};

use super::error::RealtimeError;
use super::message_router::MessageRouter;
use super::presence::PresenceBroadcaster;
use super::session_registry::{Session, SessionRegistry};
use crate::clock::Clock;
use crate::repository::MessageRepository;

/// 实时通道的总协调者
///
/// 每个连接的生命周期：`Connected`（已接入）→ `Identified`（收到 addUser）→ `Closed`。
/// 同一连接的帧由传输层按到达顺序逐个交给 [`ConnectionHub::on_message`]。
pub struct ConnectionHub {
    registry: Arc<SessionRegistry>,
    presence: PresenceBroadcaster,
    router: MessageRouter,
    enforce_sender_identity: bool,
    outbound_queue_size: usize,
}

impl ConnectionHub {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        options: &RealtimeConfig,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            presence: PresenceBroadcaster::new(Arc::clone(&registry)),
            router: MessageRouter::new(Arc::clone(&registry), messages, clock),
            registry,
            enforce_sender_identity: options.enforce_sender_identity,
            outbound_queue_size: options.outbound_queue_size,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 每个连接出站队列的容量
    pub fn outbound_queue_size(&self) -> usize {
        self.outbound_queue_size
    }

    pub async fn on_connect(&self, session: &Session) {
        self.registry.attach(session).await;
        info!(
            session_id = %session.id(),
            requested_user_id = session.requested_user_id().unwrap_or("-"),
            "实时连接已建立"
        );
    }

    /// 处理一帧入站消息，任何错误都只记录日志
    pub async fn on_message(&self, session: &Session, raw: &str) {
        debug!(session_id = %session.id(), bytes = raw.len(), "收到入站帧");

        if let Err(err) = self.dispatch(session, raw).await {
            warn!(session_id = %session.id(), error = %err, "丢弃入站帧");
        }
    }

    pub async fn on_disconnect(&self, session: &Session) {
        match self.registry.unregister(session.id()).await {
            Some(user) => info!(
                session_id = %session.id(),
                user_id = %user.user_id,
                "实时连接已断开"
            ),
            None => info!(session_id = %session.id(), "未绑定身份的连接已断开"),
        }
        self.presence.broadcast().await;
    }

    async fn dispatch(&self, session: &Session, raw: &str) -> Result<(), RealtimeError> {
        match InboundEnvelope::decode(raw)? {
            InboundEnvelope::AddUser => {
                let user_id = session
                    .requested_user_id()
                    .ok_or(RealtimeError::MissingIdentity)?;
                let connected = self
                    .registry
                    .register(session, user_id)
                    .await
                    .ok_or(RealtimeError::Detached)?;
                info!(
                    session_id = %session.id(),
                    user_id = %connected.user_id,
                    "连接已绑定用户"
                );
                self.presence.broadcast().await;
            }
            InboundEnvelope::SendMessage(payload) => {
                if self.enforce_sender_identity {
                    self.check_sender(session, &payload).await?;
                }
                self.router.route(payload).await?;
            }
        }
        Ok(())
    }

    async fn check_sender(
        &self,
        session: &Session,
        payload: &ChatMessagePayload,
    ) -> Result<(), RealtimeError> {
        match self.registry.identity_of(session.id()).await {
            Some(bound) if bound.user_id == payload.sender_id => Ok(()),
            bound => Err(RealtimeError::SenderMismatch {
                claimed: payload.sender_id.clone(),
                bound: bound.map(|user| user.user_id),
            }),
        }
    }
}
