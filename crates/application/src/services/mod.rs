mod conversation_service;
mod message_service;
mod user_service;

pub use conversation_service::{ConversationService, ConversationServiceDependencies};
pub use message_service::{MessageService, MessageServiceDependencies};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};
