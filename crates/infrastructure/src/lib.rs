//! 基础设施层实现。
//!
//! 提供数据库仓储、密码哈希、媒体上传等适配器，实现应用层定义的接口。

pub mod media;
pub mod password;
pub mod repository;

pub use media::CloudinaryMediaStorage;
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, PgGroupRepository, PgMessageRepository, PgStatusRepository, PgUserRepository,
};
