//! WebSocket 连接管理
//!
//! 封装单个 WebSocket 连接的生命周期：
//! - 在注册表中登记身份与发送端
//! - 把注册表扇出的事件写回客户端
//! - 处理客户端上行的状态浏览信号
//! - 断开时按句柄守卫清理注册信息

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use application::{ClientEvent, ConnectionRegistry, ServerEvent};
use domain::{ConnectionId, UserId};

use crate::state::AppState;

pub struct WebSocketConnection {
    socket: Option<WebSocket>,
    state: AppState,
    user_id: UserId,
    connection_id: ConnectionId,
    events: Option<mpsc::UnboundedReceiver<ServerEvent>>,
}

impl WebSocketConnection {
    /// 登记连接并发布一次在线用户集合。
    ///
    /// 身份在升级阶段已经通过 JWT 验证，这里拿到的一定是
    /// 已认证的用户。同一用户重连会覆盖旧记录。
    pub async fn new(socket: WebSocket, state: AppState, user_id: Uuid) -> Self {
        let user_id = UserId::from(user_id);
        let connection_id = ConnectionId::generate();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        state.registry.connect(user_id, connection_id, event_tx).await;
        tracing::info!(user_id = %user_id, connection_id = %connection_id, "WebSocket 连接已建立");

        // 注册表发生了变更，向所有连接重发在线集合
        state.presence.publish_online_users().await;

        Self {
            socket: Some(socket),
            state,
            user_id,
            connection_id,
            events: Some(event_rx),
        }
    }

    /// 运行连接主循环，返回即连接结束。
    pub async fn run(mut self) {
        let socket = self.socket.take().expect("socket should be available");
        let mut events = self.events.take().expect("event stream should be available");

        let (mut sender, mut incoming) = socket.split();
        // 接收任务通过这个通道让发送任务回 pong，
        // 所有对 sender 的写都留在同一个任务里
        let (pong_tx, mut pong_rx) = mpsc::channel::<Vec<u8>>(8);

        // 发送任务：注册表扇出的事件和 pong 回应都从这里写出
        let send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = pong_rx.recv() => {
                        if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                            break;
                        }
                    }
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let payload = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(err) => {
                                tracing::warn!(error = %err, "failed to serialize websocket payload");
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // 接收任务：处理来自客户端的消息
        let registry = self.state.registry.clone();
        let user_id = self.user_id;
        let recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                if Self::handle_incoming(message, &registry, user_id, &pong_tx)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        // 任一任务结束即认为连接断开
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }

        // 只有句柄仍然指向本连接时才移除记录并重发在线集合；
        // 用户已经用新连接重连时这里是空操作
        if self
            .state
            .registry
            .disconnect(self.user_id, self.connection_id)
            .await
        {
            self.state.presence.publish_online_users().await;
        }

        tracing::info!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            "WebSocket 连接已断开"
        );
    }

    async fn handle_incoming(
        message: WsMessage,
        registry: &ConnectionRegistry,
        user_id: UserId,
        pong_tx: &mpsc::Sender<Vec<u8>>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => return Err(()),
            WsMessage::Ping(data) => {
                if pong_tx.send(data.to_vec()).await.is_err() {
                    return Err(());
                }
            }
            WsMessage::Pong(_) => {}
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::StatusViewingStarted) => {
                    registry.set_viewing_status(user_id, true).await;
                }
                Ok(ClientEvent::StatusViewingEnded) => {
                    registry.set_viewing_status(user_id, false).await;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "忽略无法解析的客户端事件");
                }
            },
            WsMessage::Binary(_) => {
                tracing::debug!("忽略二进制消息");
            }
        }
        Ok(())
    }
}
