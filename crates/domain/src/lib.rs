//! 聊天后端核心领域模型
//!
//! 包含用户、会话、消息等实体，以及实时通道上交换的信封类型。

pub mod conversation;
pub mod errors;
pub mod message;
pub mod realtime;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use conversation::Conversation;
pub use errors::{DomainError, RepositoryError};
pub use message::Message;
pub use realtime::{ChatMessagePayload, ConnectedUser, InboundEnvelope, OutboundEnvelope};
pub use user::{User, UserSummary};
pub use value_objects::{
    ConversationId, MessageId, MessageText, PasswordHash, SessionId, Timestamp, UserId, Username,
};
