//! Control Context - Errors

use thiserror::Error;

/// 启动请求校验失败原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Model ID cannot be empty")]
    EmptyModelId,

    #[error("Prompt cannot be empty")]
    MissingPrompt,

    #[error("Remove the leader arm mark on your robot to control it with AI")]
    LeaderArmConflict { device_name: String },

    #[error("Speed must be a positive number, got {0}")]
    InvalidSpeed(f32),

    #[error("Custom angle format requires both min and max angle")]
    MissingAngleBounds,

    #[error("Min angle ({min}) must be lower than max angle ({max})")]
    InvalidAngleBounds { min: f32, max: f32 },
}
