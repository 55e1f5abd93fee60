//! 实时通道核心
//!
//! 进程内的 WebSocket 中枢：记录在线连接及其绑定的用户身份，
//! 把聊天消息投递到接收者的所有连接，并在连接变化时广播在线列表。

mod delivery;
mod error;
mod hub;
mod message_router;
mod presence;
mod session_registry;

pub use delivery::{fan_out, DeliveryReport};
pub use error::RealtimeError;
pub use hub::ConnectionHub;
pub use message_router::{MessageRouter, RouteOutcome};
pub use presence::PresenceBroadcaster;
pub use session_registry::{PresenceSnapshot, Session, SessionRegistry};
