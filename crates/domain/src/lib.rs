//! 聊天应用核心领域模型
//!
//! 包含用户、私聊消息、动态状态等核心实体，以及相关的业务规则。

pub mod errors;
pub mod group;
pub mod message;
pub mod status;
pub mod user;
pub mod value_objects;

pub use errors::{DomainError, DomainResult, RepositoryError};
pub use group::Group;
pub use message::{MediaAttachment, MediaType, Message};
pub use status::{Status, StatusView};
pub use user::User;
pub use value_objects::{
    ConnectionId, GroupId, MessageId, MessageText, PasswordHash, StatusId, Timestamp, UserEmail,
    UserId, Username,
};
