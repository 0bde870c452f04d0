//! 应用层错误定义
//!
//! 统一的控制操作/查询错误类型

use thiserror::Error;

use crate::application::ports::ControlApiError;
use crate::domain::control::{ControlAction, TransitionError, ValidationError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 本地校验失败，未发出任何请求
    #[error("Validation error: {}", first_message(.0))]
    Validation(Vec<ValidationError>),

    /// 另一个控制请求仍在途
    #[error("A {0} request is already in flight")]
    Busy(ControlAction),

    /// 当前状态不允许该操作
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 远程控制端点错误
    #[error("Remote control error: {0}")]
    Remote(#[from] ControlApiError),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

fn first_message(failures: &[ValidationError]) -> String {
    failures
        .first()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl ApplicationError {
    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 校验失败列表（非校验错误返回空）
    pub fn validation_failures(&self) -> &[ValidationError] {
        match self {
            Self::Validation(failures) => failures,
            _ => &[],
        }
    }
}

impl From<TransitionError> for ApplicationError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Busy(action) => Self::Busy(action),
            other => Self::InvalidState(other.to_string()),
        }
    }
}

impl From<Vec<ValidationError>> for ApplicationError {
    fn from(failures: Vec<ValidationError>) -> Self {
        Self::Validation(failures)
    }
}
