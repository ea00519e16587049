//! 媒体上传接口
//!
//! 消息附件、状态和头像都经过这里上传到外部对象存储。
//! 上传失败会中止整个用例，不会留下半成品记录。

use async_trait::async_trait;
use thiserror::Error;

/// 上传成功后外部存储返回的对象描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub secure_url: String,
    pub resource_type: String,
}

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("media upload failed: {0}")]
    Upload(String),
}

impl MediaStorageError {
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaObject, MediaStorageError>;
}
