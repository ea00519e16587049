use crate::errors::DomainError;
use crate::value_objects::{MessageId, MessageText, Timestamp, UserId};

/// 媒体类型，按 MIME 主类型归类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    File,
}

impl MediaType {
    /// 从请求携带的 MIME 类型推断媒体类型。
    pub fn from_mime(content_type: &str) -> Self {
        if content_type.starts_with("image") {
            MediaType::Image
        } else if content_type.starts_with("video") {
            MediaType::Video
        } else {
            MediaType::File
        }
    }

    /// 从上传服务返回的 resource_type 推断媒体类型。
    pub fn from_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "video" => MediaType::Video,
            "image" => MediaType::Image,
            _ => MediaType::File,
        }
    }
}

/// 消息附带的媒体描述。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// 一条点对点消息。持久化之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: Option<MessageText>,
    pub media: Option<MediaAttachment>,
    pub created_at: Timestamp,
}

impl Message {
    /// 创建新消息。文字和媒体至少要有其一。
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        receiver_id: UserId,
        text: Option<MessageText>,
        media: Option<MediaAttachment>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if text.is_none() && media.is_none() {
            return Err(DomainError::invalid_argument(
                "message",
                "text or media is required",
            ));
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            text,
            media,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn ids() -> (MessageId, UserId, UserId) {
        (
            MessageId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
        )
    }

    #[test]
    fn message_requires_text_or_media() {
        let (id, sender, receiver) = ids();
        let result = Message::new(id, sender, receiver, None, None, OffsetDateTime::now_utc());
        assert!(result.is_err());
    }

    #[test]
    fn media_only_message_is_valid() {
        let (id, sender, receiver) = ids();
        let media = MediaAttachment {
            url: "https://cdn.example.com/x.png".to_string(),
            media_type: MediaType::Image,
        };
        let message = Message::new(
            id,
            sender,
            receiver,
            None,
            Some(media),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert!(message.text.is_none());
    }

    #[test]
    fn media_type_classification_follows_mime_prefix() {
        assert_eq!(MediaType::from_mime("image/png"), MediaType::Image);
        assert_eq!(MediaType::from_mime("video/mp4"), MediaType::Video);
        assert_eq!(MediaType::from_mime("application/pdf"), MediaType::File);
    }
}
