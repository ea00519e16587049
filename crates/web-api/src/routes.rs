use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use data_encoding::BASE64;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    AuthenticateUserRequest, CreateGroupRequest, MediaUpload, RegisterUserRequest,
    SendMessageRequest, UploadStatusRequest,
};
use domain::{Group, Message, Status};

use crate::auth::LoginResponse;
use crate::dto::UserDto;
use crate::error::ApiError;
use crate::state::AppState;
use crate::ws_connection::WebSocketConnection;

/// 请求里携带的媒体负载：base64 编码的字节加 MIME 类型。
#[derive(Debug, Deserialize)]
struct MediaPayload {
    data: String,
    content_type: String,
}

impl MediaPayload {
    fn decode(self) -> Result<MediaUpload, ApiError> {
        let bytes = BASE64
            .decode(self.data.as_bytes())
            .map_err(|err| ApiError::bad_request(format!("invalid base64 media data: {err}")))?;
        Ok(MediaUpload {
            bytes,
            content_type: self.content_type,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfilePayload {
    profile_pic: MediaPayload,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    text: Option<String>,
    media: Option<MediaPayload>,
}

#[derive(Debug, Deserialize)]
struct UploadStatusPayload {
    media: MediaPayload,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateGroupPayload {
    name: String,
    members: Vec<Uuid>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/auth/check", get(check_auth))
        .route("/auth/update-profile", put(update_profile))
        .route("/auth/follow/{id}", post(follow_user))
        .route("/auth/unfollow/{id}", post(unfollow_user))
        .route("/messages/contacts", get(list_contacts))
        .route("/messages/{id}", get(get_conversation).post(send_message))
        .route("/statuses", post(upload_status).get(list_statuses))
        .route("/statuses/mine", get(my_statuses))
        .route("/statuses/{id}/seen", post(mark_status_seen))
        .route("/statuses/{id}", delete(delete_status))
        .route("/groups", post(create_group))
        .route("/groups/mine", get(my_groups))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(Uuid::from(user.id))?;

    Ok(Json(LoginResponse {
        user: UserDto::from(&user),
        token,
    }))
}

async fn check_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state.user_service.get_user(user_id).await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let upload = payload.profile_pic.decode()?;
    let user = state
        .user_service
        .update_profile_pic(user_id, upload)
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn follow_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(followee): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.user_service.follow(user_id, followee).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unfollow_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(followee): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.user_service.unfollow(user_id, followee).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contacts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let contacts = state.user_service.contacts(user_id).await?;
    Ok(Json(contacts.iter().map(UserDto::from).collect()))
}

async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state
        .message_service
        .conversation_with(user_id, other)
        .await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receiver): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let sender = state.jwt_service.extract_user_from_headers(&headers)?;
    let media = payload.media.map(MediaPayload::decode).transpose()?;

    let request = SendMessageRequest {
        sender_id: sender,
        receiver_id: receiver,
        text: payload.text,
        media,
    };

    // 接入流程跑在独立任务上：请求一旦被接受，发送方断开
    // 也不会取消上传/落库/广播
    let service = state.message_service.clone();
    let stored = tokio::spawn(async move { service.send_message(request).await })
        .await
        .map_err(|err| ApiError::internal_server_error(format!("ingestion task failed: {err}")))??;

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn upload_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UploadStatusPayload>,
) -> Result<(StatusCode, Json<Status>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let media = payload.media.decode()?;
    let status = state
        .status_service
        .upload_status(UploadStatusRequest {
            user_id,
            media,
            caption: payload.caption,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(status)))
}

async fn list_statuses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Status>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let statuses = state.status_service.visible_statuses(user_id).await?;
    Ok(Json(statuses))
}

async fn my_statuses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Status>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let statuses = state.status_service.my_statuses(user_id).await?;
    Ok(Json(statuses))
}

async fn mark_status_seen(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(status_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.status_service.mark_seen(status_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(status_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .status_service
        .delete_status(status_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let _user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let group = state
        .group_service
        .create_group(CreateGroupRequest {
            name: payload.name,
            member_ids: payload.members,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn my_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Group>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let groups = state.group_service.my_groups(user_id).await?;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    /// 与 HTTP 请求相同的 JWT。连接身份从这里解析，
    /// 不信任客户端另行声明的用户标识。
    token: String,
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = state.jwt_service.verify_token(&query.token)?;
    let user_id = claims.user_id;

    Ok(ws.on_upgrade(move |socket| async move {
        WebSocketConnection::new(socket, state, user_id)
            .await
            .run()
            .await;
    }))
}
