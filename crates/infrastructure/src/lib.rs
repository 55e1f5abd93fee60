//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储、密码哈希与数据库迁移，实现应用层定义的接口。

pub mod migrations;
pub mod password;
pub mod repository;

pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, PgConversationRepository, PgMessageRepository, PgStorage, PgUserRepository,
};
