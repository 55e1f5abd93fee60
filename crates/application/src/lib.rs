//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、仓储访问，
//! 以及实时通道的连接注册、在线广播与消息路由。

pub mod auth;
pub mod clock;
pub mod dto;
pub mod error;
pub mod memory;
pub mod password;
pub mod realtime;
pub mod repository;
pub mod services;

pub use auth::{AuthError, AuthVerifier};
pub use clock::{Clock, SystemClock};
pub use dto::{ConversationView, UserDto};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError};
pub use realtime::{
    ConnectionHub, DeliveryReport, MessageRouter, PresenceBroadcaster, RealtimeError, Session,
    SessionRegistry,
};
pub use repository::{ConversationRepository, MessageRepository, Pagination, UserRepository};
pub use services::{
    AuthenticateUserRequest, ConversationService, ConversationServiceDependencies,
    MessageService, MessageServiceDependencies, RegisterUserRequest, UserService,
    UserServiceDependencies,
};
