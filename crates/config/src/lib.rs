//! 统一配置中心
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//! - 内置默认值
//! - TOML 配置文件（默认 `chat-backend.toml`，可用 `CHAT_CONFIG` 指定路径）
//! - `CHAT_` 前缀的环境变量，`__` 表示层级，例如 `CHAT_DATABASE__URL`
//! - `DATABASE_URL` 与 `JWT_SECRET`

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "chat-backend.toml";

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 为空时允许任意来源
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
        }
    }
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// 不设置时使用 bcrypt 默认值
    #[serde(default)]
    pub bcrypt_cost: Option<u32>,
}

/// 实时通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// 单个入站帧的最大字节数
    pub max_message_size: usize,
    /// 为 true 时丢弃 senderId 与连接身份不一致的消息
    #[serde(default)]
    pub enforce_sender_identity: bool,
    /// 每个连接出站队列的容量，队列满时新的推送被丢弃
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
}

fn default_outbound_queue_size() -> usize {
    32
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_message_size: 2000,
            enforce_sender_identity: false,
            outbound_queue_size: default_outbound_queue_size(),
        }
    }
}

impl AppConfig {
    /// 从默认位置加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CHAT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_figment(Self::figment(&path))
    }

    /// 组装配置来源，文件不存在时直接跳过
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHAT_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "database.url".into()),
            )
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "jwt.secret".into()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|err| ConfigError::Load(Box::new(err)))?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::InvalidDatabaseUrl(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidDatabaseConfig(
                "Max connections must be greater than 0".to_string(),
            ));
        }

        // 至少 256 位
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.jwt.expiration_hours <= 0 {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT expiration must be positive".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerPort(
                "Port must be greater than 0".to_string(),
            ));
        }

        if let Some(cost) = self.security.bcrypt_cost {
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::InvalidSecurityConfig(
                    "bcrypt cost must be between 4 and 31".to_string(),
                ));
            }
        }

        if self.realtime.max_message_size == 0 {
            return Err(ConfigError::InvalidRealtimeConfig(
                "max_message_size must be greater than 0".to_string(),
            ));
        }

        if self.realtime.outbound_queue_size == 0 {
            return Err(ConfigError::InvalidRealtimeConfig(
                "outbound_queue_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 可以写进日志的配置摘要，不含数据库口令与 JWT 密钥
    pub fn sanitize(&self) -> String {
        let database = match self.database.url.split_once('@') {
            Some((_, host)) => format!("postgres://[REDACTED]@{host}"),
            None => self.database.url.clone(),
        };
        format!(
            "server={}:{} database={} max_connections={} jwt_expiration_hours={} realtime.max_message_size={} realtime.enforce_sender_identity={} realtime.outbound_queue_size={}",
            self.server.host,
            self.server.port,
            database,
            self.database.max_connections,
            self.jwt.expiration_hours,
            self.realtime.max_message_size,
            self.realtime.enforce_sender_identity,
            self.realtime.outbound_queue_size,
        )
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(Box<figment::Error>),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),
    #[error("Invalid server port: {0}")]
    InvalidServerPort(String),
    #[error("Invalid database configuration: {0}")]
    InvalidDatabaseConfig(String),
    #[error("Invalid security configuration: {0}")]
    InvalidSecurityConfig(String),
    #[error("Invalid realtime configuration: {0}")]
    InvalidRealtimeConfig(String),
}
