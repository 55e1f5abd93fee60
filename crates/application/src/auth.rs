use domain::UserId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token expired")]
    Expired,
    #[error("token issue failed: {0}")]
    Issue(String),
}

/// 令牌到用户身份的校验
pub trait AuthVerifier: Send + Sync {
    fn identity_from_token(&self, token: &str) -> Result<UserId, AuthError>;
}
