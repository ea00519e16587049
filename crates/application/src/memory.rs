//! 内存实现的仓储与媒体存储（用于测试和单机演示部署）

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::{
    Group, Message, RepositoryError, Status, StatusId, Timestamp, User, UserEmail, UserId,
};

use crate::media::{MediaObject, MediaStorage, MediaStorageError};
use crate::repository::{GroupRepository, MessageRepository, StatusRepository, UserRepository};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
    follows: RwLock<HashMap<UserId, HashSet<UserId>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_except(&self, id: UserId) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        let mut others: Vec<User> = users
            .values()
            .filter(|user| user.id != id)
            .cloned()
            .collect();
        others.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(others)
    }

    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        let mut follows = self.follows.write().await;
        follows.entry(follower).or_default().insert(followee);
        Ok(())
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        let mut follows = self.follows.write().await;
        if let Some(set) = follows.get_mut(&follower) {
            set.remove(&followee);
        }
        Ok(())
    }

    async fn list_following(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let follows = self.follows.read().await;
        Ok(follows
            .get(&follower)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.push(message.clone());
        Ok(message)
    }

    async fn list_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|message| {
                (message.sender_id == a && message.receiver_id == b)
                    || (message.sender_id == b && message.receiver_id == a)
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryStatusRepository {
    statuses: RwLock<Vec<Status>>,
}

impl MemoryStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusRepository for MemoryStatusRepository {
    async fn create(&self, status: Status) -> Result<Status, RepositoryError> {
        let mut statuses = self.statuses.write().await;
        statuses.push(status.clone());
        Ok(status)
    }

    async fn update(&self, status: Status) -> Result<Status, RepositoryError> {
        let mut statuses = self.statuses.write().await;
        match statuses.iter_mut().find(|stored| stored.id == status.id) {
            Some(stored) => {
                *stored = status.clone();
                Ok(status)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        Ok(self
            .statuses
            .read()
            .await
            .iter()
            .find(|status| status.id == id)
            .cloned())
    }

    async fn list_for_users(
        &self,
        user_ids: &[UserId],
        now: Timestamp,
    ) -> Result<Vec<Status>, RepositoryError> {
        let statuses = self.statuses.read().await;
        let mut visible: Vec<Status> = statuses
            .iter()
            .filter(|status| user_ids.contains(&status.user_id) && !status.is_expired(now))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    async fn delete_owned(&self, id: StatusId, owner: UserId) -> Result<(), RepositoryError> {
        let mut statuses = self.statuses.write().await;
        let before = statuses.len();
        statuses.retain(|status| !(status.id == id && status.user_id == owner));
        if statuses.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryGroupRepository {
    groups: RwLock<Vec<Group>>,
}

impl MemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError> {
        let mut groups = self.groups.write().await;
        groups.push(group.clone());
        Ok(group)
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups
            .iter()
            .filter(|group| group.has_member(user_id))
            .cloned()
            .collect())
    }
}

/// 内存媒体存储。记录上传次数，可切换为固定失败，
/// 用来验证"上传失败则不落库不广播"的用例路径。
#[derive(Default)]
pub struct MemoryMediaStorage {
    uploads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStorage for MemoryMediaStorage {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaObject, MediaStorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MediaStorageError::upload("simulated upload failure"));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let resource_type = if content_type.starts_with("image") {
            "image"
        } else if content_type.starts_with("video") {
            "video"
        } else {
            "raw"
        };
        Ok(MediaObject {
            secure_url: format!("https://media.test/{}", Uuid::new_v4()),
            resource_type: resource_type.to_string(),
        })
    }
}
