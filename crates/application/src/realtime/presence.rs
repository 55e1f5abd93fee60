use std::sync::Arc;

use domain::OutboundEnvelope;
use tracing::{debug, warn};

use super::delivery::{fan_out, DeliveryReport};
use super::session_registry::SessionRegistry;

/// 在线列表广播
///
/// 每次注册表变化后把当前在线用户推送给所有存活连接，
/// 包括刚刚加入的那个。
pub struct PresenceBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn broadcast(&self) -> DeliveryReport {
        let snapshot = self.registry.snapshot().await;
        let online = snapshot.users.len();

        let frame = match OutboundEnvelope::UserList(snapshot.users).encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "在线列表序列化失败");
                return DeliveryReport::default();
            }
        };

        let report = fan_out(&snapshot.sessions, &frame);
        debug!(
            online,
            delivered = report.delivered,
            failed = report.failed,
            "广播在线列表"
        );
        report
    }
}
