//! 密码哈希接口

use async_trait::async_trait;
use domain::PasswordHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    /// 存储的哈希格式无法识别
    #[error("failed to verify password: {0}")]
    Verify(String),
    #[error("password worker stopped: {0}")]
    Worker(String),
}

/// 实现方负责把计算挪出异步运行时
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;

    /// 密码不匹配返回 `Ok(false)`，只有哈希本身损坏时才返回错误
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}
