//! 限时动态服务
//!
//! 状态的过期剔除交给存储层，这里只负责上传、可见范围和浏览记录。

use std::sync::Arc;

use domain::{DomainError, MediaType, Status, StatusId, UserId};
use uuid::Uuid;

use crate::{
    clock::Clock, error::ApplicationError, media::MediaStorage,
    repository::{StatusRepository, UserRepository},
    services::message_service::MediaUpload,
};

#[derive(Debug, Clone)]
pub struct UploadStatusRequest {
    pub user_id: Uuid,
    pub media: MediaUpload,
    pub caption: Option<String>,
}

pub struct StatusServiceDependencies {
    pub status_repository: Arc<dyn StatusRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub media_storage: Arc<dyn MediaStorage>,
    pub clock: Arc<dyn Clock>,
}

pub struct StatusService {
    deps: StatusServiceDependencies,
}

impl StatusService {
    pub fn new(deps: StatusServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn upload_status(
        &self,
        request: UploadStatusRequest,
    ) -> Result<Status, ApplicationError> {
        let user_id = UserId::from(request.user_id);

        let stored_media = self
            .deps
            .media_storage
            .upload(request.media.bytes, &request.media.content_type)
            .await?;

        // 媒体类型以上传服务的判定为准
        let media_type = MediaType::from_resource_type(&stored_media.resource_type);

        let status = Status::new(
            StatusId::from(Uuid::new_v4()),
            user_id,
            stored_media.secure_url,
            media_type,
            request.caption.filter(|caption| !caption.trim().is_empty()),
            self.deps.clock.now(),
        )?;

        let stored = self.deps.status_repository.create(status).await?;
        tracing::info!(status_id = %stored.id, user_id = %user_id, "状态已发布");
        Ok(stored)
    }

    /// 对 viewer 可见的状态：自己的加上所关注用户的，未过期部分。
    pub async fn visible_statuses(&self, viewer: Uuid) -> Result<Vec<Status>, ApplicationError> {
        let viewer = UserId::from(viewer);
        let mut visible_to = self.deps.user_repository.list_following(viewer).await?;
        visible_to.push(viewer);

        let statuses = self
            .deps
            .status_repository
            .list_for_users(&visible_to, self.deps.clock.now())
            .await?;
        Ok(statuses)
    }

    pub async fn my_statuses(&self, user_id: Uuid) -> Result<Vec<Status>, ApplicationError> {
        let user_id = UserId::from(user_id);
        let statuses = self
            .deps
            .status_repository
            .list_for_users(&[user_id], self.deps.clock.now())
            .await?;
        Ok(statuses)
    }

    /// 记录浏览。本人浏览直接成功但不记录。
    pub async fn mark_seen(&self, status_id: Uuid, viewer: Uuid) -> Result<(), ApplicationError> {
        let viewer_id = UserId::from(viewer);
        let mut status = self
            .deps
            .status_repository
            .find_by_id(StatusId::from(status_id))
            .await?
            .ok_or(DomainError::StatusNotFound)?;

        let viewer_user = self
            .deps
            .user_repository
            .find_by_id(viewer_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let recorded = status.mark_seen(
            viewer_id,
            viewer_user.username.as_str().to_owned(),
            self.deps.clock.now(),
        );
        if recorded {
            self.deps.status_repository.update(status).await?;
        }
        Ok(())
    }

    pub async fn delete_status(&self, status_id: Uuid, owner: Uuid) -> Result<(), ApplicationError> {
        self.deps
            .status_repository
            .delete_owned(StatusId::from(status_id), UserId::from(owner))
            .await
            .map_err(|err| match err {
                domain::RepositoryError::NotFound => DomainError::StatusNotFound.into(),
                other => ApplicationError::from(other),
            })
    }
}
