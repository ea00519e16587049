use std::sync::Arc;

use domain::{DomainError, PasswordHash, User, UserEmail, UserId, Username};
use uuid::Uuid;

use crate::{
    clock::Clock, error::ApplicationError, media::MediaStorage, password::PasswordHasher,
    repository::UserRepository, services::message_service::MediaUpload,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub media_storage: Arc<dyn MediaStorage>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse(request.email)?;

        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let now = self.deps.clock.now();
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            username,
            email,
            password_hash,
            now,
        );

        let stored = self.deps.user_repository.create(user).await?;
        Ok(stored)
    }

    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let email = UserEmail::parse(request.email)?;
        let user = self
            .deps
            .user_repository
            .find_by_email(email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    /// 更新头像：先上传，成功后才写回用户记录。
    pub async fn update_profile_pic(
        &self,
        user_id: Uuid,
        upload: MediaUpload,
    ) -> Result<User, ApplicationError> {
        let mut user = self.get_user(user_id).await?;

        let stored = self
            .deps
            .media_storage
            .upload(upload.bytes, &upload.content_type)
            .await?;

        user.set_profile_pic(stored.secure_url, self.deps.clock.now());
        let updated = self.deps.user_repository.update(user).await?;
        Ok(updated)
    }

    pub async fn follow(&self, follower: Uuid, followee: Uuid) -> Result<(), ApplicationError> {
        if follower == followee {
            return Err(DomainError::invalid_argument("followee", "cannot follow yourself").into());
        }
        let follower = UserId::from(follower);
        let followee = UserId::from(followee);
        self.deps
            .user_repository
            .find_by_id(followee)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        self.deps.user_repository.follow(follower, followee).await?;
        Ok(())
    }

    pub async fn unfollow(&self, follower: Uuid, followee: Uuid) -> Result<(), ApplicationError> {
        let follower = UserId::from(follower);
        let followee = UserId::from(followee);
        self.deps
            .user_repository
            .find_by_id(followee)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        self.deps
            .user_repository
            .unfollow(follower, followee)
            .await?;
        Ok(())
    }

    /// 会话侧边栏：除自己以外的所有用户。
    pub async fn contacts(&self, user_id: Uuid) -> Result<Vec<User>, ApplicationError> {
        let others = self
            .deps
            .user_repository
            .list_except(UserId::from(user_id))
            .await?;
        Ok(others)
    }

    /// 用户关注的人（状态可见范围使用）。
    pub async fn following(&self, user_id: Uuid) -> Result<Vec<UserId>, ApplicationError> {
        let following = self
            .deps
            .user_repository
            .list_following(UserId::from(user_id))
            .await?;
        Ok(following)
    }
}
