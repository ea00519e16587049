//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数验证失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 用户已存在
    #[error("user already exists")]
    UserAlreadyExists,

    /// 用户不存在
    #[error("user not found")]
    UserNotFound,

    /// 消息不存在
    #[error("message not found")]
    MessageNotFound,

    /// 状态不存在
    #[error("status not found")]
    StatusNotFound,

    /// 群组不存在
    #[error("group not found")]
    GroupNotFound,

    /// 当前状态下不允许的操作
    #[error("operation not allowed")]
    OperationNotAllowed,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 仓储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("resource not found")]
    NotFound,

    #[error("resource conflict")]
    Conflict,

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
