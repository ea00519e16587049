//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    ConnectionRegistry, FanoutMessageBroadcaster, GroupService, GroupServiceDependencies,
    MessageService, MessageServiceDependencies, PresenceBroadcaster, StatusService,
    StatusServiceDependencies, SystemClock, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, CloudinaryMediaStorage, PgGroupRepository,
    PgMessageRepository, PgStatusRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "配置未通过生产校验，仅适合开发环境");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 仓储
    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let status_repository = Arc::new(PgStatusRepository::new(pg_pool.clone()));
    let group_repository = Arc::new(PgGroupRepository::new(pg_pool));

    // 外部适配器
    let media_storage: Arc<dyn application::MediaStorage> =
        Arc::new(CloudinaryMediaStorage::new(config.media.clone()));
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    // 实时子系统：注册表 + 在线状态广播 + 消息投递网关
    let registry = Arc::new(ConnectionRegistry::new());
    let presence = Arc::new(PresenceBroadcaster::new(registry.clone()));
    let broadcaster: Arc<dyn application::MessageBroadcaster> =
        Arc::new(FanoutMessageBroadcaster::new(registry.clone()));

    // 应用层服务
    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        media_storage: media_storage.clone(),
        clock: clock.clone(),
    });

    let message_service = MessageService::new(MessageServiceDependencies {
        message_repository,
        user_repository: user_repository.clone(),
        media_storage: media_storage.clone(),
        broadcaster,
        clock: clock.clone(),
    });

    let status_service = StatusService::new(StatusServiceDependencies {
        status_repository,
        user_repository: user_repository.clone(),
        media_storage,
        clock: clock.clone(),
    });

    let group_service = GroupService::new(GroupServiceDependencies {
        group_repository,
        user_repository,
        clock,
    });

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        Arc::new(status_service),
        Arc::new(group_service),
        registry,
        presence,
        jwt_service,
    );

    // 启动 Web 服务器
    let app = router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
