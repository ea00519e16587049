//! PostgreSQL 仓储实现。

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use application::{GroupRepository, MessageRepository, StatusRepository, UserRepository};
use domain::{
    Group, GroupId, MediaAttachment, MediaType, Message, MessageId, MessageText, PasswordHash,
    RepositoryError, Status, StatusId, StatusView, Timestamp, User, UserEmail, UserId, Username,
};

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn map_insert_err(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    map_sqlx_err(err)
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    profile_pic: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            username,
            email,
            password,
            profile_pic: value.profile_pic,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    text: Option<String>,
    media_url: Option<String>,
    media_type: Option<MediaType>,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let text = value
            .text
            .map(MessageText::parse)
            .transpose()
            .map_err(|err| invalid_data(err.to_string()))?;
        let media = match (value.media_url, value.media_type) {
            (Some(url), Some(media_type)) => Some(MediaAttachment { url, media_type }),
            (None, None) => None,
            _ => return Err(invalid_data("message media columns are inconsistent")),
        };
        Message::new(
            MessageId::from(value.id),
            UserId::from(value.sender_id),
            UserId::from(value.receiver_id),
            text,
            media,
            value.created_at,
        )
        .map_err(|err| invalid_data(err.to_string()))
    }
}

#[derive(Debug, FromRow)]
struct StatusRecord {
    id: Uuid,
    user_id: Uuid,
    media_url: String,
    media_type: MediaType,
    caption: Option<String>,
    seen_by: Json<Vec<StatusView>>,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

impl From<StatusRecord> for Status {
    fn from(value: StatusRecord) -> Self {
        Status {
            id: StatusId::from(value.id),
            user_id: UserId::from(value.user_id),
            media_url: value.media_url,
            media_type: value.media_type,
            caption: value.caption,
            seen_by: value.seen_by.0,
            created_at: value.created_at,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct GroupRecord {
    id: Uuid,
    name: String,
    member_ids: Vec<Uuid>,
    created_at: OffsetDateTime,
}

impl From<GroupRecord> for Group {
    fn from(value: GroupRecord) -> Self {
        Group {
            id: GroupId::from(value.id),
            name: value.name,
            member_ids: value.member_ids.into_iter().map(UserId::from).collect(),
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, password_hash, profile_pic, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, email, password_hash, profile_pic, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.profile_pic)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, profile_pic = $5, updated_at = $6
            WHERE id = $1
            RETURNING id, username, email, password_hash, profile_pic, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.profile_pic)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash, profile_pic, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash, profile_pic, created_at, updated_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn list_except(&self, id: UserId) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash, profile_pic, created_at, updated_at
            FROM users WHERE id <> $1
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, now())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(follower))
        .bind(Uuid::from(followee))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"DELETE FROM user_follows WHERE follower_id = $1 AND followee_id = $2"#,
        )
        .bind(Uuid::from(follower))
        .bind(Uuid::from(followee))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_following(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"SELECT followee_id FROM user_follows WHERE follower_id = $1"#,
        )
        .bind(Uuid::from(follower))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows.into_iter().map(|(id,)| UserId::from(id)).collect())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let (media_url, media_type) = match &message.media {
            Some(media) => (Some(media.url.clone()), Some(media.media_type)),
            None => (None, None),
        };

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, text, media_url, media_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, sender_id, receiver_id, text, media_url, media_type, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(message.text.as_ref().map(|text| text.as_str()))
        .bind(media_url)
        .bind(media_type)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Message::try_from(record)
    }

    async fn list_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, sender_id, receiver_id, text, media_url, media_type, created_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgStatusRepository {
    pool: PgPool,
}

impl PgStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepository for PgStatusRepository {
    async fn create(&self, status: Status) -> Result<Status, RepositoryError> {
        let record = sqlx::query_as::<_, StatusRecord>(
            r#"
            INSERT INTO statuses (id, user_id, media_url, media_type, caption, seen_by, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, media_url, media_type, caption, seen_by, created_at, expires_at
            "#,
        )
        .bind(Uuid::from(status.id))
        .bind(Uuid::from(status.user_id))
        .bind(&status.media_url)
        .bind(status.media_type)
        .bind(&status.caption)
        .bind(Json(&status.seen_by))
        .bind(status.created_at)
        .bind(status.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Ok(Status::from(record))
    }

    async fn update(&self, status: Status) -> Result<Status, RepositoryError> {
        let record = sqlx::query_as::<_, StatusRecord>(
            r#"
            UPDATE statuses
            SET caption = $2, seen_by = $3
            WHERE id = $1
            RETURNING id, user_id, media_url, media_type, caption, seen_by, created_at, expires_at
            "#,
        )
        .bind(Uuid::from(status.id))
        .bind(&status.caption)
        .bind(Json(&status.seen_by))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Status::from(record))
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        let record = sqlx::query_as::<_, StatusRecord>(
            r#"
            SELECT id, user_id, media_url, media_type, caption, seen_by, created_at, expires_at
            FROM statuses WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Status::from))
    }

    async fn list_for_users(
        &self,
        user_ids: &[UserId],
        now: Timestamp,
    ) -> Result<Vec<Status>, RepositoryError> {
        let ids: Vec<Uuid> = user_ids.iter().copied().map(Uuid::from).collect();
        let records = sqlx::query_as::<_, StatusRecord>(
            r#"
            SELECT id, user_id, media_url, media_type, caption, seen_by, created_at, expires_at
            FROM statuses
            WHERE user_id = ANY($1) AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(&ids)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Status::from).collect())
    }

    async fn delete_owned(&self, id: StatusId, owner: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM statuses WHERE id = $1 AND user_id = $2"#)
            .bind(Uuid::from(id))
            .bind(Uuid::from(owner))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError> {
        let member_ids: Vec<Uuid> = group.member_ids.iter().copied().map(Uuid::from).collect();
        let record = sqlx::query_as::<_, GroupRecord>(
            r#"
            INSERT INTO groups (id, name, member_ids, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, member_ids, created_at
            "#,
        )
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(&member_ids)
        .bind(group.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Ok(Group::from(record))
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError> {
        let records = sqlx::query_as::<_, GroupRecord>(
            r#"
            SELECT id, name, member_ids, created_at
            FROM groups
            WHERE $1 = ANY(member_ids)
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Group::from).collect())
    }
}
