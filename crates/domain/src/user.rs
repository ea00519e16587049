use serde::{Deserialize, Serialize};

use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId, Username};

/// 注册用户。
///
/// 关注关系单独存储，不作为实体字段，避免每次加载用户都把整张关注表带出来。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)]
    pub password: PasswordHash,
    pub profile_pic: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        email: UserEmail,
        password: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password,
            profile_pic: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_profile_pic(&mut self, url: String, now: Timestamp) {
        self.profile_pic = Some(url);
        self.updated_at = now;
    }
}
