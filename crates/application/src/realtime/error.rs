use thiserror::Error;

/// 实时通道中的错误，全部只记录日志，不会中断连接
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("malformed frame: {0}")]
    Decode(String),
    #[error("failed to persist message: {0}")]
    Persistence(String),
    #[error("failed to deliver frame: {0}")]
    Delivery(String),
    /// `addUser` 时连接没有携带 userId 查询参数
    #[error("connection has no user id")]
    MissingIdentity,
    /// 连接已从注册表移除后才处理到的帧
    #[error("connection is no longer attached")]
    Detached,
    #[error("sender {claimed} does not match connection identity {bound:?}")]
    SenderMismatch {
        claimed: String,
        bound: Option<String>,
    },
}

impl From<serde_json::Error> for RealtimeError {
    fn from(value: serde_json::Error) -> Self {
        RealtimeError::Decode(value.to_string())
    }
}
