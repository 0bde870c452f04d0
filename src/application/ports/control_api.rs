//! Control API Port - 远程 AI 控制端点抽象
//!
//! 定义 start / pause / resume / stop / status 五个操作，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::control::{ControlRequest, SessionHandle, SessionStatus, StatusReport};

/// 远程控制端点错误
#[derive(Debug, Clone, Error)]
pub enum ControlApiError {
    /// 没有收到响应（连接失败、连接中断等）
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 服务端结构化拒绝；携带的会话信息是权威状态
    #[error("Rejected by server: {}", message.as_deref().unwrap_or("no details"))]
    Rejected {
        id: Option<String>,
        status: Option<SessionStatus>,
        message: Option<String>,
    },
}

impl ControlApiError {
    /// 拒绝原因是“已有会话在运行”时，返回该会话句柄
    pub fn active_session(&self) -> Option<SessionHandle> {
        match self {
            ControlApiError::Rejected {
                id: Some(id),
                status: Some(status),
                ..
            } if status.is_active() => Some(SessionHandle::new(id.clone(), *status)),
            _ => None,
        }
    }

    /// 服务端是否可能已经执行了请求
    ///
    /// 非 2xx 响应和结构化拒绝都表示请求未执行；2xx 但响应体无法解析时结果未知
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            ControlApiError::Network(_) | ControlApiError::Timeout | ControlApiError::InvalidResponse(_)
        )
    }
}

/// Control API Port
///
/// pause / resume / stop 在服务端不返回有效负载，成功即确认
#[async_trait]
pub trait ControlApiPort: Send + Sync {
    /// 启动 AI 控制循环
    async fn start(&self, request: &ControlRequest) -> Result<SessionHandle, ControlApiError>;

    async fn pause(&self) -> Result<(), ControlApiError>;

    async fn resume(&self) -> Result<(), ControlApiError>;

    async fn stop(&self) -> Result<(), ControlApiError>;

    /// 查询当前会话状态（轮询使用）
    async fn status(&self) -> Result<StatusReport, ControlApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_session_from_rejection() {
        let err = ControlApiError::Rejected {
            id: Some("abc".to_string()),
            status: Some(SessionStatus::Running),
            message: Some("AI control is already running".to_string()),
        };
        let handle = err.active_session().unwrap();
        assert_eq!(handle.id.as_str(), "abc");
        assert_eq!(handle.status, SessionStatus::Running);
    }

    #[test]
    fn test_rejection_without_active_session() {
        let stopped = ControlApiError::Rejected {
            id: Some("abc".to_string()),
            status: Some(SessionStatus::Stopped),
            message: None,
        };
        assert!(stopped.active_session().is_none());
        assert!(ControlApiError::Timeout.active_session().is_none());
        assert!(ControlApiError::Timeout.outcome_unknown());
        assert!(!stopped.outcome_unknown());
    }

    #[test]
    fn test_outcome_unknown_only_without_definite_answer() {
        assert!(ControlApiError::Network("reset".to_string()).outcome_unknown());
        assert!(ControlApiError::InvalidResponse("eof".to_string()).outcome_unknown());
        assert!(!ControlApiError::Http {
            status: 500,
            body: String::new()
        }
        .outcome_unknown());
    }
}
