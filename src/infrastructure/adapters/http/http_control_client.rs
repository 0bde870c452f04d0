//! HTTP Control Client - 调用机器人服务端的 AI 控制接口
//!
//! 实现 ControlApiPort / RobotServerPort / ModelRegistryPort
//!
//! 服务端 API:
//! POST /ai-control/start     Request: ControlRequest (JSON)
//!                            Response: {"status", "ai_control_signal_id", "ai_control_signal_status"}
//! POST /ai-control/pause     无请求体
//! POST /ai-control/resume    无请求体
//! POST /ai-control/stop      无请求体
//! POST /ai-control/status    Response: {"id", "status"}
//! GET  /status               Response: {"robots", "robot_status"}
//! POST /training/models/read
//! POST /model/configuration

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::dto::{
    AckResponse, ModelConfigurationRequest, StartResponse, StatusResponse, TrainingsList,
};
use crate::application::ports::{
    ControlApiError, ControlApiPort, ModelConfiguration, ModelRegistryPort, RobotServerPort,
    ServerStatus, TrainedModel,
};
use crate::domain::control::{ControlRequest, SessionHandle, SessionStatus, StatusReport};

/// HTTP 控制客户端配置
#[derive(Debug, Clone)]
pub struct HttpControlClientConfig {
    /// 机器人服务端基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpControlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpControlClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 控制客户端
pub struct HttpControlClient {
    client: Client,
    base_url: String,
}

impl HttpControlClient {
    /// 创建新的 HTTP 控制客户端
    pub fn new(config: HttpControlClientConfig) -> Result<Self, ControlApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ControlApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 发送无请求体的 POST 请求，非 2xx 响应转为错误
    async fn post(&self, path: &str) -> Result<Response, ControlApiError> {
        let response = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(response).await
    }

    /// 发送 JSON 请求体的 POST 请求
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ControlApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(response).await
    }

    async fn post_ack(&self, path: &str) -> Result<(), ControlApiError> {
        tracing::debug!(url = %self.url(path), "Sending AI control request");

        let response = self.post(path).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ControlApiError::InvalidResponse(e.to_string()))?;

        // 空响应体也视为确认；显式 "error" 状态视为拒绝
        let ack: AckResponse = serde_json::from_str(&text).unwrap_or_default();
        if ack.status.as_deref() == Some("error") {
            return Err(ControlApiError::Rejected {
                id: None,
                status: None,
                message: ack.message,
            });
        }
        Ok(())
    }
}

fn map_send_error(e: reqwest::Error) -> ControlApiError {
    if e.is_timeout() {
        ControlApiError::Timeout
    } else if e.is_connect() {
        ControlApiError::Network(format!("Cannot connect to robot server: {}", e))
    } else {
        ControlApiError::Network(e.to_string())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ControlApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ControlApiError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ControlApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ControlApiError::InvalidResponse(e.to_string()))
}

fn parse_status(raw: &str) -> Result<SessionStatus, ControlApiError> {
    SessionStatus::from_str(raw)
        .ok_or_else(|| ControlApiError::InvalidResponse(format!("Unknown session status: {}", raw)))
}

#[async_trait]
impl ControlApiPort for HttpControlClient {
    async fn start(&self, request: &ControlRequest) -> Result<SessionHandle, ControlApiError> {
        tracing::debug!(
            url = %self.url("/ai-control/start"),
            model_id = %request.model_id,
            model_type = %request.model_type,
            "Sending AI control start request"
        );

        let response = self.post_json("/ai-control/start", request).await?;
        let body: StartResponse = decode(response).await?;

        if body.status == "error" {
            return Err(ControlApiError::Rejected {
                id: body.ai_control_signal_id,
                status: body
                    .ai_control_signal_status
                    .as_deref()
                    .and_then(SessionStatus::from_str),
                message: body.message,
            });
        }

        let status = body
            .ai_control_signal_status
            .as_deref()
            .map(parse_status)
            .transpose()?;

        let id = body.ai_control_signal_id.ok_or_else(|| {
            ControlApiError::InvalidResponse("Missing ai_control_signal_id".to_string())
        })?;
        let handle = SessionHandle::new(id, status.unwrap_or(SessionStatus::Waiting));

        tracing::info!(
            session_id = %handle.id,
            status = %handle.status,
            "AI control start accepted"
        );

        Ok(handle)
    }

    async fn pause(&self) -> Result<(), ControlApiError> {
        self.post_ack("/ai-control/pause").await
    }

    async fn resume(&self) -> Result<(), ControlApiError> {
        self.post_ack("/ai-control/resume").await
    }

    async fn stop(&self) -> Result<(), ControlApiError> {
        self.post_ack("/ai-control/stop").await
    }

    async fn status(&self) -> Result<StatusReport, ControlApiError> {
        let response = self.post("/ai-control/status").await?;
        let body: StatusResponse = decode(response).await?;
        let status = parse_status(&body.status)?;
        Ok(StatusReport::new(body.id.as_deref(), status))
    }
}

#[async_trait]
impl RobotServerPort for HttpControlClient {
    async fn server_status(&self) -> Result<ServerStatus, ControlApiError> {
        let response = self
            .client
            .get(self.url("/status"))
            .send()
            .await
            .map_err(map_send_error)?;
        let response = ensure_success(response).await?;
        decode(response).await
    }
}

#[async_trait]
impl ModelRegistryPort for HttpControlClient {
    async fn list_trained_models(&self) -> Result<Vec<TrainedModel>, ControlApiError> {
        let response = self.post("/training/models/read").await?;
        let body: TrainingsList = decode(response).await?;
        Ok(body.models)
    }

    async fn model_configuration(
        &self,
        model_id: &str,
        model_type: &str,
    ) -> Result<ModelConfiguration, ControlApiError> {
        let body = ModelConfigurationRequest {
            model_id,
            model_type,
        };
        let response = self.post_json("/model/configuration", &body).await?;
        decode(response).await
    }
}
