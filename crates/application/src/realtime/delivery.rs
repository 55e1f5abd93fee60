use tracing::warn;

use super::session_registry::Session;

/// 一次扇出的投递结果，仅用于观测
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// 把同一帧推送给每个连接，单个连接失败只记录并跳过
pub fn fan_out(sessions: &[Session], frame: &str) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for session in sessions {
        match session.send(frame.to_owned()) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.failed += 1;
                warn!(session_id = %session.id(), error = %err, "推送到连接失败");
            }
        }
    }

    if report.failed > 0 {
        warn!(
            delivered = report.delivered,
            failed = report.failed,
            "部分连接推送失败"
        );
    }

    report
}
