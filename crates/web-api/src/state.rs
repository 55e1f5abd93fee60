use std::sync::Arc;

use application::{ConnectionHub, ConversationService, MessageService, UserService};
use config::RealtimeConfig;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub conversation_service: Arc<ConversationService>,
    pub message_service: Arc<MessageService>,
    pub hub: Arc<ConnectionHub>,
    pub jwt_service: Arc<JwtService>,
    pub realtime: RealtimeConfig,
}
