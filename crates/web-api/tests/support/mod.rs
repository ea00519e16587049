//! 集成测试装置：内存适配器 + 真实 HTTP/WebSocket 服务

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use application::memory::{
    MemoryGroupRepository, MemoryMediaStorage, MemoryMessageRepository, MemoryStatusRepository,
    MemoryUserRepository,
};
use application::{
    ConnectionRegistry, FanoutMessageBroadcaster, GroupService, GroupServiceDependencies,
    MessageService, MessageServiceDependencies, PresenceBroadcaster, StatusService,
    StatusServiceDependencies, SystemClock, UserService, UserServiceDependencies,
};
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService};

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 测试用密码哈希器：明文前加个前缀，避免 bcrypt 拖慢测试。
struct PlainTextHasher;

#[async_trait::async_trait]
impl application::PasswordHasher for PlainTextHasher {
    async fn hash(
        &self,
        plaintext: &str,
    ) -> Result<domain::PasswordHash, application::PasswordHasherError> {
        domain::PasswordHash::new(format!("plain:{plaintext}"))
            .map_err(|err| application::PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &domain::PasswordHash,
    ) -> Result<bool, application::PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain:{plaintext}"))
    }
}

pub struct TestContext {
    pub router: Router,
    pub media: Arc<MemoryMediaStorage>,
}

pub async fn build_context() -> TestContext {
    let user_repository = Arc::new(MemoryUserRepository::new());
    let message_repository = Arc::new(MemoryMessageRepository::new());
    let status_repository = Arc::new(MemoryStatusRepository::new());
    let group_repository = Arc::new(MemoryGroupRepository::new());
    let media = Arc::new(MemoryMediaStorage::new());

    let password_hasher: Arc<dyn application::PasswordHasher> = Arc::new(PlainTextHasher);
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let registry = Arc::new(ConnectionRegistry::new());
    let presence = Arc::new(PresenceBroadcaster::new(registry.clone()));
    let broadcaster = Arc::new(FanoutMessageBroadcaster::new(registry.clone()));

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher: password_hasher.clone(),
        media_storage: media.clone(),
        clock: clock.clone(),
    });

    let message_service = MessageService::new(MessageServiceDependencies {
        message_repository: message_repository.clone(),
        user_repository: user_repository.clone(),
        media_storage: media.clone(),
        broadcaster,
        clock: clock.clone(),
    });

    let status_service = StatusService::new(StatusServiceDependencies {
        status_repository: status_repository.clone(),
        user_repository: user_repository.clone(),
        media_storage: media.clone(),
        clock: clock.clone(),
    });

    let group_service = GroupService::new(GroupServiceDependencies {
        group_repository: group_repository.clone(),
        user_repository: user_repository.clone(),
        clock,
    });

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key-with-enough-length-32".to_string(),
        expiration_hours: 24,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        Arc::new(status_service),
        Arc::new(group_service),
        registry,
        presence,
        jwt_service,
    );

    TestContext {
        router: build_router_fn(state),
        media,
    }
}

/// 启动测试服务器，返回地址和关闭句柄。
pub async fn spawn_server(router: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    (addr, shutdown_tx)
}

/// 注册并登录一个用户，返回 (用户ID, token)。
pub async fn register_and_login(client: &Client, base_http: &str, name: &str) -> (Uuid, String) {
    let user = client
        .post(format!("{base_http}/api/v1/auth/register"))
        .json(&json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "secret"
        }))
        .send()
        .await
        .expect("register")
        .json::<serde_json::Value>()
        .await
        .expect("register json");
    let user_id = user["id"].as_str().expect("user id").parse::<Uuid>().unwrap();

    let login = client
        .post(format!("{base_http}/api/v1/auth/login"))
        .json(&json!({
            "email": format!("{name}@example.com"),
            "password": "secret"
        }))
        .send()
        .await
        .expect("login")
        .json::<serde_json::Value>()
        .await
        .expect("login json");
    let token = login["token"].as_str().expect("token").to_owned();

    (user_id, token)
}

/// 建立认证过的 WebSocket 连接。
pub async fn connect_ws(addr: SocketAddr, token: &str) -> WsClient {
    let ws_url = format!("ws://{addr}/api/v1/ws?token={token}");
    let (ws, _) = connect_async(ws_url).await.expect("ws connect");
    ws
}

/// 读取下一条文本事件并解析为 JSON。
pub async fn next_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("等待事件超时")
            .expect("连接被关闭")
            .expect("读取事件失败");
        match message {
            TungsteniteMessage::Text(payload) => {
                return serde_json::from_str(&payload).expect("事件不是合法 JSON");
            }
            // 忽略协议层消息
            _ => continue,
        }
    }
}

/// 断言下一条事件是 getOnlineUsers，并返回在线用户 id 列表。
pub async fn expect_online_users(ws: &mut WsClient) -> Vec<String> {
    let event = next_event(ws).await;
    assert_eq!(event["type"], "getOnlineUsers", "事件应该是在线集合: {event}");
    event["payload"]
        .as_array()
        .expect("payload 应该是数组")
        .iter()
        .map(|id| id.as_str().expect("用户 id 应该是字符串").to_owned())
        .collect()
}

/// 断言在给定时间内没有任何事件到达。
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let result = tokio::time::timeout(window, ws.next()).await;
    assert!(result.is_err(), "不应该收到事件: {result:?}");
}
