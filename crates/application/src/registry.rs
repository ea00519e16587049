//! 连接注册表
//!
//! 唯一拥有 "用户 -> 活动连接" 映射的组件。所有写操作和快照读取
//! 都经过同一把锁，外部只能通过这里暴露的方法访问映射。

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use domain::{ConnectionId, UserId};

use crate::broadcaster::ServerEvent;

/// 连接的事件发送端。注册表在连接存活期间独占持有。
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// 一个活动连接的注册信息。
struct ConnectionEntry {
    connection_id: ConnectionId,
    sender: EventSender,
    viewing_status: bool,
}

/// 在一次加锁中取出的注册表快照。
///
/// 在线用户列表和发送端都是拷贝，广播方拿到快照后必须在
/// 临界区之外做逐连接推送，避免慢客户端阻塞注册表。
pub struct PresenceSnapshot {
    pub online: Vec<UserId>,
    pub senders: Vec<EventSender>,
}

/// 连接注册表。
///
/// 不变量：每个用户最多一条活动记录，后连接者胜出；
/// 只有携带当前记录连接句柄的断开才会移除记录。
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<UserId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 注册连接。同一用户重复连接时覆盖旧记录（不合并），
    /// 浏览状态标记重置为 false。
    pub async fn connect(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: EventSender,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(
            user_id,
            ConnectionEntry {
                connection_id,
                sender,
                viewing_status: false,
            },
        );
    }

    /// 注销连接。仅当记录中的句柄与传入句柄一致时移除，
    /// 迟到的断开（用户已用新连接重连）是无害的空操作。
    ///
    /// 返回是否实际发生了移除。
    pub async fn disconnect(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&user_id) {
            Some(entry) if entry.connection_id == connection_id => {
                entries.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    /// 更新用户的状态浏览标记。用户没有活动连接时为空操作
    /// （客户端信号和断开之间存在竞态，这是正常情况）。
    pub async fn set_viewing_status(&self, user_id: UserId, viewing: bool) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&user_id) {
            Some(entry) => {
                entry.viewing_status = viewing;
                true
            }
            None => false,
        }
    }

    pub async fn is_viewing_status(&self, user_id: UserId) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(&user_id)
            .map(|entry| entry.viewing_status)
            .unwrap_or(false)
    }

    /// 当前在线用户集合的时点快照，排序后返回，
    /// 保证同一注册表内容产生完全相同的载荷。
    pub async fn online_user_ids(&self) -> Vec<UserId> {
        let entries = self.entries.read().await;
        let mut online: Vec<UserId> = entries.keys().copied().collect();
        online.sort();
        online
    }

    /// 一次加锁同时取出在线集合与所有发送端。
    pub async fn snapshot(&self) -> PresenceSnapshot {
        let entries = self.entries.read().await;
        let mut online: Vec<UserId> = entries.keys().copied().collect();
        online.sort();
        let senders = entries.values().map(|entry| entry.sender.clone()).collect();
        PresenceSnapshot { online, senders }
    }

    /// 所有活动连接的发送端拷贝。
    pub async fn senders(&self) -> Vec<EventSender> {
        let entries = self.entries.read().await;
        entries.values().map(|entry| entry.sender.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    fn channel() -> (EventSender, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn snapshot_tracks_connects_and_disconnects() {
        let registry = ConnectionRegistry::new();
        let (u1, u2) = (user(), user());
        let (c1, c2) = (ConnectionId::generate(), ConnectionId::generate());

        registry.connect(u1, c1, channel().0).await;
        registry.connect(u2, c2, channel().0).await;

        let mut expected = vec![u1, u2];
        expected.sort();
        assert_eq!(registry.online_user_ids().await, expected);

        assert!(registry.disconnect(u1, c1).await);
        assert_eq!(registry.online_user_ids().await, vec![u2]);

        assert!(registry.disconnect(u2, c2).await);
        assert!(registry.online_user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn reconnect_wins_and_stale_disconnect_is_noop() {
        let registry = ConnectionRegistry::new();
        let u = user();
        let old = ConnectionId::generate();
        let new = ConnectionId::generate();

        registry.connect(u, old, channel().0).await;
        // 旧连接还没断开，用户带着新句柄重连
        registry.connect(u, new, channel().0).await;
        assert_eq!(registry.online_user_ids().await, vec![u]);

        // 旧连接迟到的断开不能影响新记录
        assert!(!registry.disconnect(u, old).await);
        assert_eq!(registry.online_user_ids().await, vec![u]);

        assert!(registry.disconnect(u, new).await);
        assert!(registry.online_user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn viewing_status_resets_on_reconnect() {
        let registry = ConnectionRegistry::new();
        let u = user();
        let c = ConnectionId::generate();

        registry.connect(u, c, channel().0).await;
        assert!(registry.set_viewing_status(u, true).await);
        assert!(registry.is_viewing_status(u).await);

        // 重连覆盖记录，浏览标记回到初始值
        registry.connect(u, ConnectionId::generate(), channel().0).await;
        assert!(!registry.is_viewing_status(u).await);
    }

    #[tokio::test]
    async fn viewing_status_is_noop_without_connection() {
        let registry = ConnectionRegistry::new();
        let u = user();
        assert!(!registry.set_viewing_status(u, true).await);
        assert!(!registry.is_viewing_status(u).await);
    }

    #[tokio::test]
    async fn snapshot_is_pure_function_of_contents() {
        let registry = ConnectionRegistry::new();
        let (u1, u2) = (user(), user());
        registry.connect(u1, ConnectionId::generate(), channel().0).await;
        registry.connect(u2, ConnectionId::generate(), channel().0).await;

        let first = registry.snapshot().await;
        let second = registry.snapshot().await;
        assert_eq!(first.online, second.online);
        assert_eq!(first.senders.len(), second.senders.len());
    }
}
