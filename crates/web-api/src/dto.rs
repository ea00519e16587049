use serde::Serialize;
use uuid::Uuid;

use domain::User;

/// 对外暴露的用户信息。密码哈希永远不出现在这里。
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_pic: Option<String>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            profile_pic: user.profile_pic.clone(),
        }
    }
}
