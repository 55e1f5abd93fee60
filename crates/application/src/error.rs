use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::auth::AuthError;
use crate::password::PasswordHasherError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),
    /// 用户名不存在或密码错误，不区分两者
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("authorization failed")]
    Authorization,
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
