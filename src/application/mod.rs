//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ControlApi、RobotServer、ModelRegistry）
//! - session_coordinator: AI 控制会话编排
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod error;
pub mod ports;
pub mod queries;
pub mod session_coordinator;

// Re-exports
pub use error::ApplicationError;

pub use ports::{
    ControlApiError, ControlApiPort, ModelConfiguration, ModelRegistryPort, RobotServerPort,
    ServerStatus, TrainedModel,
};

pub use queries::{
    handlers::{GetModelConfigurationHandler, ListTrainedModelsHandler},
    GetModelConfiguration, ListTrainedModels,
};

pub use session_coordinator::{Ack, SessionCoordinator, SessionCoordinatorConfig};
