//! 消息接入服务
//!
//! 固定的副作用顺序：校验 -> 上传媒体（如有）-> 落库 -> 广播。
//! 任何一步失败都会中止整个请求，不做重试。

use std::sync::Arc;

use domain::{
    DomainError, MediaAttachment, MediaType, Message, MessageId, MessageText, UserId,
};
use uuid::Uuid;

use crate::{
    broadcaster::MessageBroadcaster, clock::Clock, error::ApplicationError, media::MediaStorage,
    repository::{MessageRepository, UserRepository},
};

/// 请求中携带的原始媒体负载。
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,   // 来自已认证会话
    pub receiver_id: Uuid, // 来自请求路径
    pub text: Option<String>,
    pub media: Option<MediaUpload>,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub media_storage: Arc<dyn MediaStorage>,
    pub broadcaster: Arc<dyn MessageBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 接收一条出站消息：校验、上传媒体、落库，然后恰好广播一次。
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let sender_id = UserId::from(request.sender_id);
        let receiver_id = UserId::from(request.receiver_id);

        // 校验阶段：在产生任何副作用之前完成
        let text = request.text.map(MessageText::parse).transpose()?;
        if text.is_none() && request.media.is_none() {
            return Err(DomainError::invalid_argument("message", "text or media is required").into());
        }
        self.deps
            .user_repository
            .find_by_id(receiver_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        // 媒体先于落库上传：上传失败时不允许留下任何消息记录
        let media = match request.media {
            Some(upload) => {
                let media_type = MediaType::from_mime(&upload.content_type);
                let stored = self
                    .deps
                    .media_storage
                    .upload(upload.bytes, &upload.content_type)
                    .await?;
                Some(MediaAttachment {
                    url: stored.secure_url,
                    media_type,
                })
            }
            None => None,
        };

        let now = self.deps.clock.now();
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            receiver_id,
            text,
            media,
            now,
        )?;

        let stored = self.deps.message_repository.create(message).await?;

        // 广播持久化后的完整记录（含分配的 id 和时间戳）
        if let Err(broadcast_error) = self.deps.broadcaster.broadcast(stored.clone()).await {
            tracing::error!(
                message_id = %stored.id,
                error = %broadcast_error,
                "消息已落库但广播失败"
            );
            return Err(broadcast_error.into());
        }

        tracing::info!(
            message_id = %stored.id,
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            "消息投递完成"
        );
        Ok(stored)
    }

    /// 两个用户之间的消息历史，按创建顺序返回。
    pub async fn conversation_with(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<Vec<Message>, ApplicationError> {
        let records = self
            .deps
            .message_repository
            .list_between(UserId::from(me), UserId::from(other))
            .await?;
        Ok(records)
    }
}
