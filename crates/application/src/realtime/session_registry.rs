use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use domain::{ConnectedUser, SessionId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::RealtimeError;

/// 一个实时连接的句柄
///
/// 只持有出站队列的发送端，真正的 socket 写入由传输层的写任务完成。
/// 队列有界，客户端不读取时后续推送直接失败而不是无限堆积。
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    requested_user_id: Option<String>,
    sender: mpsc::Sender<String>,
}

impl Session {
    pub fn new(
        requested_user_id: Option<String>,
        sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            requested_user_id: requested_user_id
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            sender,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// 升级请求中携带的 userId 查询参数
    pub fn requested_user_id(&self) -> Option<&str> {
        self.requested_user_id.as_deref()
    }

    pub fn send(&self, frame: String) -> Result<(), RealtimeError> {
        self.sender.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => {
                RealtimeError::Delivery(format!("outbound queue of session {} is full", self.id))
            }
            TrySendError::Closed(_) => {
                RealtimeError::Delivery(format!("session {} is closed", self.id))
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 同一时刻的在线用户与连接快照
#[derive(Debug, Clone, Default)]
pub struct PresenceSnapshot {
    pub users: Vec<ConnectedUser>,
    pub sessions: Vec<Session>,
}

struct SessionSlot {
    session: Session,
    user: Option<ConnectedUser>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, SessionSlot>,
    by_user: HashMap<String, HashSet<SessionId>>,
}

impl RegistryState {
    fn unindex(&mut self, user_id: &str, session_id: SessionId) {
        if let Some(ids) = self.by_user.get_mut(user_id) {
            ids.remove(&session_id);
            if ids.is_empty() {
                self.by_user.remove(user_id);
            }
        }
    }
}

/// 连接注册表
///
/// 正向表（连接到用户）与反向索引（用户到连接）由同一把锁保护，
/// 两者在并发连接与断开下始终一致。
#[derive(Default)]
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个尚未绑定身份的连接
    pub async fn attach(&self, session: &Session) {
        let mut state = self.state.write().await;
        state
            .sessions
            .entry(session.id())
            .or_insert_with(|| SessionSlot {
                session: session.clone(),
                user: None,
            });
    }

    /// 把已接入的连接绑定到用户，重复绑定时以最后一次为准
    ///
    /// 连接未接入或已经移除时返回 `None`，不会把它重新放回注册表。
    pub async fn register(&self, session: &Session, user_id: &str) -> Option<ConnectedUser> {
        let connected = ConnectedUser {
            user_id: user_id.to_owned(),
            connection_token: Uuid::new_v4().to_string(),
        };

        let mut state = self.state.write().await;
        let previous = state
            .sessions
            .get_mut(&session.id())?
            .user
            .replace(connected.clone());

        if let Some(previous) = previous {
            state.unindex(&previous.user_id, session.id());
        }
        state
            .by_user
            .entry(connected.user_id.clone())
            .or_default()
            .insert(session.id());

        Some(connected)
    }

    /// 移除连接，返回它曾绑定的身份；连接不存在时什么也不做
    pub async fn unregister(&self, session_id: SessionId) -> Option<ConnectedUser> {
        let mut state = self.state.write().await;
        let slot = state.sessions.remove(&session_id)?;
        let user = slot.user?;
        state.unindex(&user.user_id, session_id);
        Some(user)
    }

    pub async fn list_connected(&self) -> Vec<ConnectedUser> {
        let state = self.state.read().await;
        state
            .sessions
            .values()
            .filter_map(|slot| slot.user.clone())
            .collect()
    }

    /// 用户当前的全部连接，离线时为空
    pub async fn sessions_for_user(&self, user_id: &str) -> Vec<Session> {
        let state = self.state.read().await;
        state
            .by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.sessions.get(id))
                    .map(|slot| slot.session.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn identity_of(&self, session_id: SessionId) -> Option<ConnectedUser> {
        let state = self.state.read().await;
        state
            .sessions
            .get(&session_id)
            .and_then(|slot| slot.user.clone())
    }

    /// 所有存活的连接，包括尚未绑定身份的
    pub async fn sessions(&self) -> Vec<Session> {
        let state = self.state.read().await;
        state
            .sessions
            .values()
            .map(|slot| slot.session.clone())
            .collect()
    }

    pub async fn snapshot(&self) -> PresenceSnapshot {
        let state = self.state.read().await;
        let mut snapshot = PresenceSnapshot::default();
        for slot in state.sessions.values() {
            snapshot.sessions.push(slot.session.clone());
            if let Some(user) = &slot.user {
                snapshot.users.push(user.clone());
            }
        }
        snapshot
    }

    /// 已绑定身份的连接数
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.by_user.values().map(HashSet::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
