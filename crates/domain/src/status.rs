use serde::{Deserialize, Serialize};
use time::Duration;

use crate::errors::DomainError;
use crate::message::MediaType;
use crate::value_objects::{StatusId, Timestamp, UserId};

/// 状态的有效期，超时后由存储层负责剔除。
const STATUS_TTL_HOURS: i64 = 24;

/// 某个用户对状态的一次浏览记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub user_id: UserId,
    pub full_name: String,
    pub seen_at: Timestamp,
}

/// 限时动态：一条带媒体的状态，到期后自动消失。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub user_id: UserId,
    pub media_url: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
    pub seen_by: Vec<StatusView>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Status {
    /// 创建新状态。只接受图片或视频。
    pub fn new(
        id: StatusId,
        user_id: UserId,
        media_url: String,
        media_type: MediaType,
        caption: Option<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if media_url.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "media_url",
                "cannot be empty",
            ));
        }
        if media_type == MediaType::File {
            return Err(DomainError::invalid_argument(
                "media_type",
                "status media must be image or video",
            ));
        }
        Ok(Self {
            id,
            user_id,
            media_url,
            media_type,
            caption,
            seen_by: Vec::new(),
            created_at: now,
            expires_at: now + Duration::hours(STATUS_TTL_HOURS),
        })
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// 记录一次浏览。本人浏览和重复浏览都被忽略。
    ///
    /// 返回是否产生了新的浏览记录。
    pub fn mark_seen(&mut self, viewer: UserId, full_name: String, now: Timestamp) -> bool {
        if viewer == self.user_id {
            return false;
        }
        if self.seen_by.iter().any(|view| view.user_id == viewer) {
            return false;
        }
        self.seen_by.push(StatusView {
            user_id: viewer,
            full_name,
            seen_at: now,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample(owner: UserId) -> Status {
        Status::new(
            StatusId::from(Uuid::new_v4()),
            owner,
            "https://cdn.example.com/s.jpg".to_string(),
            MediaType::Image,
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap()
    }

    #[test]
    fn status_rejects_file_media() {
        let result = Status::new(
            StatusId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            "https://cdn.example.com/doc.pdf".to_string(),
            MediaType::File,
            None,
            OffsetDateTime::now_utc(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn expires_a_day_after_creation() {
        let status = sample(UserId::from(Uuid::new_v4()));
        assert_eq!(status.expires_at - status.created_at, Duration::hours(24));
        assert!(!status.is_expired(status.created_at));
        assert!(status.is_expired(status.created_at + Duration::hours(25)));
    }

    #[test]
    fn owner_view_is_ignored() {
        let owner = UserId::from(Uuid::new_v4());
        let mut status = sample(owner);
        assert!(!status.mark_seen(owner, "Owner".to_string(), OffsetDateTime::now_utc()));
        assert!(status.seen_by.is_empty());
    }

    #[test]
    fn duplicate_view_recorded_once() {
        let mut status = sample(UserId::from(Uuid::new_v4()));
        let viewer = UserId::from(Uuid::new_v4());
        let now = OffsetDateTime::now_utc();
        assert!(status.mark_seen(viewer, "Viewer".to_string(), now));
        assert!(!status.mark_seen(viewer, "Viewer".to_string(), now));
        assert_eq!(status.seen_by.len(), 1);
    }
}
