//! 媒体上传适配器测试
//!
//! 用 wiremock 模拟上传服务，覆盖成功和失败两条路径。

use application::{MediaStorage, MediaStorageError};
use config::MediaConfig;
use infrastructure::CloudinaryMediaStorage;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn media_config(base_url: String) -> MediaConfig {
    MediaConfig {
        base_url,
        cloud_name: "testcloud".to_string(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    }
}

#[tokio::test]
async fn upload_returns_secure_url_and_resource_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/testcloud/auto/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secure_url": "https://res.cloudinary.com/testcloud/image/upload/v1/abc.jpg",
            "resource_type": "image"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = CloudinaryMediaStorage::new(media_config(server.uri()));
    let object = storage
        .upload(vec![0xff, 0xd8, 0xff], "image/jpeg")
        .await
        .expect("upload should succeed");

    assert_eq!(
        object.secure_url,
        "https://res.cloudinary.com/testcloud/image/upload/v1/abc.jpg"
    );
    assert_eq!(object.resource_type, "image");
}

#[tokio::test]
async fn rejected_upload_surfaces_as_upload_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/testcloud/auto/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "upstream exploded" }
        })))
        .mount(&server)
        .await;

    let storage = CloudinaryMediaStorage::new(media_config(server.uri()));
    let result = storage.upload(vec![0x00], "video/mp4").await;

    match result {
        Err(MediaStorageError::Upload(message)) => {
            assert!(message.contains("500"), "错误里应该带上游状态码: {message}");
        }
        other => panic!("expected upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_response_body_is_an_upload_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/testcloud/auto/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let storage = CloudinaryMediaStorage::new(media_config(server.uri()));
    assert!(storage.upload(vec![0x00], "image/png").await.is_err());
}
