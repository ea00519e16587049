//! 媒体上传适配器
//!
//! 对接 Cloudinary 风格的上传 API：multipart 表单 + 请求签名，
//! `resource_type` 走 auto 自动识别。

use application::{MediaObject, MediaStorage, MediaStorageError};
use async_trait::async_trait;
use config::MediaConfig;
use data_encoding::HEXLOWER;
use ring::digest;
use serde::Deserialize;
use std::time::Duration;

/// 上传请求的整体超时。上游没有规定单独的上传时限，
/// 这里兜底防止挂死的上传任务永远占着后台任务。
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    resource_type: String,
}

pub struct CloudinaryMediaStorage {
    http: reqwest::Client,
    config: MediaConfig,
}

impl CloudinaryMediaStorage {
    pub fn new(config: MediaConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .expect("failed to build http client");
        Self { http, config }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/auto/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Cloudinary 签名：待签参数串拼上 api_secret 后取摘要。
    fn sign(&self, params: &str) -> String {
        let payload = format!("{}{}", params, self.config.api_secret);
        let digest = digest::digest(&digest::SHA256, payload.as_bytes());
        HEXLOWER.encode(digest.as_ref())
    }
}

#[async_trait]
impl MediaStorage for CloudinaryMediaStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaObject, MediaStorageError> {
        let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
        let signature = self.sign(&format!("timestamp={timestamp}"));

        let file = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload")
            .mime_str(content_type)
            .map_err(|err| MediaStorageError::upload(format!("invalid content type: {err}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|err| MediaStorageError::upload(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "媒体上传被拒绝");
            return Err(MediaStorageError::upload(format!(
                "upload rejected with status {status}: {body}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| MediaStorageError::upload(format!("invalid upload response: {err}")))?;

        Ok(MediaObject {
            secure_url: body.secure_url,
            resource_type: body.resource_type,
        })
    }
}
