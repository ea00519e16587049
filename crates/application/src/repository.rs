use async_trait::async_trait;
use domain::{
    Group, Message, RepositoryError, Status, StatusId, Timestamp, User, UserEmail, UserId,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
    /// 除指定用户外的所有用户（会话侧边栏）。
    async fn list_except(&self, id: UserId) -> Result<Vec<User>, RepositoryError>;
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError>;
    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError>;
    async fn list_following(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 保存消息并返回持久化后的记录。先落库后广播。
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    /// 两个用户之间的全部消息，按创建顺序排列。
    async fn list_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn create(&self, status: Status) -> Result<Status, RepositoryError>;
    async fn update(&self, status: Status) -> Result<Status, RepositoryError>;
    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError>;
    /// 指定用户集合的未过期状态，按创建时间倒序。
    /// 过期剔除是存储层的职责，这里只看得到存活的记录。
    async fn list_for_users(
        &self,
        user_ids: &[UserId],
        now: Timestamp,
    ) -> Result<Vec<Status>, RepositoryError>;
    /// 删除属于 owner 的状态；不存在或不属于 owner 时返回 NotFound。
    async fn delete_owned(&self, id: StatusId, owner: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError>;
    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError>;
}
