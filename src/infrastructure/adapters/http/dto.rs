//! Wire DTOs - 机器人服务端 HTTP 接口的请求/响应结构

use serde::{Deserialize, Serialize};

use crate::application::ports::TrainedModel;

/// `POST /ai-control/start` 响应
#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    /// "success" | "error"
    pub status: String,
    #[serde(default)]
    pub ai_control_signal_id: Option<String>,
    #[serde(default)]
    pub ai_control_signal_status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /ai-control/status` 响应
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
}

/// pause / resume / stop 的确认响应（字段均可缺省）
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AckResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /training/models/read` 响应
#[derive(Debug, Deserialize)]
pub(crate) struct TrainingsList {
    #[serde(default)]
    pub models: Vec<TrainedModel>,
}

/// `POST /model/configuration` 请求体
#[derive(Debug, Serialize)]
pub(crate) struct ModelConfigurationRequest<'a> {
    pub model_id: &'a str,
    pub model_type: &'a str,
}
