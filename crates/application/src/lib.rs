//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，以及实时子系统的核心：
//! 连接注册表、在线状态广播器和消息投递网关。对外部适配器
//! （密码哈希、媒体上传、持久化存储）只依赖抽象接口。

pub mod broadcaster;
pub mod clock;
pub mod error;
pub mod media;
pub mod memory;
pub mod password;
pub mod registry;
pub mod repository;
pub mod services;

pub use broadcaster::{
    BroadcastError, ClientEvent, FanoutMessageBroadcaster, MessageBroadcaster, PresenceBroadcaster,
    ServerEvent,
};
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use media::{MediaObject, MediaStorage, MediaStorageError};
pub use password::{PasswordHasher, PasswordHasherError};
pub use registry::{ConnectionRegistry, EventSender, PresenceSnapshot};
pub use repository::{GroupRepository, MessageRepository, StatusRepository, UserRepository};
pub use services::{
    AuthenticateUserRequest, CreateGroupRequest, GroupService, GroupServiceDependencies,
    MediaUpload, MessageService, MessageServiceDependencies, RegisterUserRequest,
    SendMessageRequest, StatusService, StatusServiceDependencies, UploadStatusRequest, UserService,
    UserServiceDependencies,
};
