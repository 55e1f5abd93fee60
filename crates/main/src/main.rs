//! 主应用程序入口
//!
//! 加载配置、连接数据库并执行迁移，然后启动 HTTP 与 WebSocket 服务。

use std::sync::Arc;

use application::{
    Clock, ConnectionHub, ConversationService, ConversationServiceDependencies, MessageService,
    MessageServiceDependencies, PasswordHasher, SystemClock, UserService,
    UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, BcryptPasswordHasher, PgStorage, MIGRATOR};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    config.validate()?;
    tracing::info!(config = %config.sanitize(), "配置加载完成");

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
    MIGRATOR.run(&pg_pool).await?;
    tracing::info!("数据库迁移完成");

    let storage = PgStorage::new(pg_pool);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let password_hasher: Arc<dyn PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(config.security.bcrypt_cost));

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: storage.user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    });
    let conversation_service = ConversationService::new(ConversationServiceDependencies {
        conversation_repository: storage.conversation_repository.clone(),
        user_repository: storage.user_repository.clone(),
        message_repository: storage.message_repository.clone(),
        clock: clock.clone(),
    });
    let message_service = MessageService::new(MessageServiceDependencies {
        conversation_repository: storage.conversation_repository.clone(),
        message_repository: storage.message_repository.clone(),
        clock: clock.clone(),
    });
    let hub = Arc::new(ConnectionHub::new(
        storage.message_repository.clone(),
        clock,
        &config.realtime,
    ));

    let state = AppState {
        user_service: Arc::new(user_service),
        conversation_service: Arc::new(conversation_service),
        message_service: Arc::new(message_service),
        hub,
        jwt_service: Arc::new(JwtService::new(config.jwt.clone())),
        realtime: config.realtime.clone(),
    };

    let app = router(state, &config.server.cors_origins);
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("聊天服务启动在 http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "监听退出信号失败");
        std::future::pending::<()>().await;
    }
}
