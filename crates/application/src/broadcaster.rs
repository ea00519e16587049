//! 实时事件广播
//!
//! 在线状态广播器和消息投递网关。两者都从注册表取一次快照，
//! 然后在临界区之外逐连接推送；单个连接投递失败静默丢弃，
//! 不重试也不确认。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain::{Message, UserId};

use crate::registry::ConnectionRegistry;

/// 服务器推送给客户端的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    /// 当前在线用户集合，注册表每次变更后发给所有连接
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),
    /// 新消息入库后发给所有连接
    #[serde(rename = "newMessage")]
    NewMessage(Message),
}

/// 客户端通过连接上行的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "statusViewingStarted")]
    StatusViewingStarted,
    #[serde(rename = "statusViewingEnded")]
    StatusViewingEnded,
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 消息投递网关。
///
/// 消息入库后经由这里推送。当前策略是全量扇出（推给所有连接，
/// 不只发送者和接收者）；定向投递将来只需要替换这一个实现。
#[async_trait]
pub trait MessageBroadcaster: Send + Sync {
    async fn broadcast(&self, message: Message) -> Result<(), BroadcastError>;
}

/// 在线状态广播器。
///
/// 每次注册表变更后把完整的在线用户集合发给所有连接，
/// 不做增量 diff。
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 发布当前在线用户集合。快照在锁内取出，推送在锁外完成。
    pub async fn publish_online_users(&self) {
        let snapshot = self.registry.snapshot().await;
        let event = ServerEvent::OnlineUsers(snapshot.online);
        for sender in &snapshot.senders {
            // 连接刚好关闭时发送失败，按设计直接丢弃
            let _ = sender.send(event.clone());
        }
    }
}

/// 基于注册表扇出的消息投递实现。
pub struct FanoutMessageBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl FanoutMessageBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessageBroadcaster for FanoutMessageBroadcaster {
    async fn broadcast(&self, message: Message) -> Result<(), BroadcastError> {
        let senders = self.registry.senders().await;
        let event = ServerEvent::NewMessage(message);
        for sender in &senders {
            if sender.send(event.clone()).is_err() {
                tracing::debug!("接收端已关闭，事件被丢弃");
            }
        }
        Ok(())
    }
}
