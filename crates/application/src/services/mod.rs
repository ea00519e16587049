mod group_service;
mod message_service;
mod status_service;
mod user_service;


pub use group_service::{CreateGroupRequest, GroupService, GroupServiceDependencies};
pub use message_service::{
    MediaUpload, MessageService, MessageServiceDependencies, SendMessageRequest,
};
pub use status_service::{StatusService, StatusServiceDependencies, UploadStatusRequest};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};
