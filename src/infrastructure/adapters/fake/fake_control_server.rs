//! Fake Control Server - 进程内模拟的机器人服务端
//!
//! 不发起网络请求，按服务端语义维护会话状态；可注入失败和延迟，用于测试与离线运行

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    ControlApiError, ControlApiPort, ModelConfiguration, ModelRegistryPort, RobotServerPort,
    ServerStatus, TrainedModel,
};
use crate::domain::control::{
    ConnectedRobot, ControlRequest, SessionHandle, SessionStatus, StatusReport,
};

/// 可注入失败的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    Start,
    Pause,
    Resume,
    Stop,
    Status,
    ServerStatus,
}

/// 注入的失败
#[derive(Debug, Clone)]
enum Injected {
    /// 请求未执行，直接返回错误
    Fail(ControlApiError),
    /// 请求已执行，但响应丢失
    LoseResponse,
}

#[derive(Debug)]
struct FakeState {
    status: SessionStatus,
    session_id: Option<String>,
    /// 启动请求被接受后立即报告的状态
    start_status: SessionStatus,
    robots: Vec<ConnectedRobot>,
    trained_models: Vec<TrainedModel>,
    model_configuration: ModelConfiguration,
    injected: HashMap<FakeOperation, VecDeque<Injected>>,
    start_requests: Vec<ControlRequest>,
}

/// Fake Control Server
pub struct FakeControlServer {
    state: Mutex<FakeState>,
    latency: Mutex<Duration>,
    status_calls: AtomicUsize,
    control_calls: AtomicUsize,
}

impl FakeControlServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                status: SessionStatus::Stopped,
                session_id: None,
                start_status: SessionStatus::Waiting,
                robots: Vec::new(),
                trained_models: Vec::new(),
                model_configuration: ModelConfiguration::default(),
                injected: HashMap::new(),
                start_requests: Vec::new(),
            }),
            latency: Mutex::new(Duration::ZERO),
            status_calls: AtomicUsize::new(0),
            control_calls: AtomicUsize::new(0),
        }
    }

    /// 带已连接机器人的服务端
    pub fn with_robots(robots: Vec<ConnectedRobot>) -> Self {
        let server = Self::new();
        server.lock().robots = robots;
        server
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // 测试替身：锁中毒说明测试已 panic，继续使用内部数据即可
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_start_status(&self, status: SessionStatus) {
        self.lock().start_status = status;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn add_trained_model(&self, model: TrainedModel) {
        self.lock().trained_models.push(model);
    }

    pub fn set_model_configuration(&self, configuration: ModelConfiguration) {
        self.lock().model_configuration = configuration;
    }

    /// 下一次该操作返回指定错误，且不执行
    pub fn fail_next(&self, operation: FakeOperation, error: ControlApiError) {
        self.lock()
            .injected
            .entry(operation)
            .or_default()
            .push_back(Injected::Fail(error));
    }

    /// 下一次该操作在服务端生效，但客户端收到网络错误
    pub fn lose_next_response(&self, operation: FakeOperation) {
        self.lock()
            .injected
            .entry(operation)
            .or_default()
            .push_back(Injected::LoseResponse);
    }

    /// 直接设置服务端会话状态（模拟控制循环自行推进或外部客户端操作）
    pub fn force_status(&self, id: Option<&str>, status: SessionStatus) {
        let mut state = self.lock();
        state.status = status;
        state.session_id = id.map(str::to_string);
    }

    /// 控制循环完成加载：waiting → running
    pub fn advance_to_running(&self) {
        let mut state = self.lock();
        if state.status == SessionStatus::Waiting {
            state.status = SessionStatus::Running;
        }
    }

    pub fn current(&self) -> StatusReport {
        let state = self.lock();
        StatusReport::new(state.session_id.as_deref(), state.status)
    }

    pub fn start_requests(&self) -> Vec<ControlRequest> {
        self.lock().start_requests.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// start / pause / resume / stop 的调用次数
    pub fn control_calls(&self) -> usize {
        self.control_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_injected(&self, operation: FakeOperation) -> Option<Injected> {
        self.lock()
            .injected
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
    }

    /// 执行一次控制操作：处理注入的失败，并在服务端生效后返回结果
    async fn run<T>(
        &self,
        operation: FakeOperation,
        apply: impl FnOnce(&mut FakeState) -> Result<T, ControlApiError>,
    ) -> Result<T, ControlApiError> {
        self.simulate_latency().await;
        match self.take_injected(operation) {
            Some(Injected::Fail(error)) => Err(error),
            Some(Injected::LoseResponse) => {
                match apply(&mut self.lock()) {
                    Ok(_) => tracing::debug!(?operation, "FakeControlServer: applied, dropping response"),
                    Err(e) => tracing::debug!(?operation, error = %e, "FakeControlServer: failed, dropping response"),
                }
                Err(ControlApiError::Network("connection reset by peer".to_string()))
            }
            None => apply(&mut self.lock()),
        }
    }
}

impl Default for FakeControlServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlApiPort for FakeControlServer {
    async fn start(&self, request: &ControlRequest) -> Result<SessionHandle, ControlApiError> {
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        let request = request.clone();
        self.run(FakeOperation::Start, move |state| {
            if state.status.is_active() {
                return Err(ControlApiError::Rejected {
                    id: state.session_id.clone(),
                    status: Some(state.status),
                    message: Some("AI control is already running".to_string()),
                });
            }
            let id = uuid::Uuid::new_v4().to_string();
            state.status = state.start_status;
            state.session_id = Some(id.clone());
            state.start_requests.push(request);
            tracing::debug!(session_id = %id, "FakeControlServer: control loop started");
            Ok(SessionHandle::new(id, state.start_status))
        })
        .await
    }

    async fn pause(&self) -> Result<(), ControlApiError> {
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        self.run(FakeOperation::Pause, |state| {
            if state.status == SessionStatus::Running {
                state.status = SessionStatus::Paused;
            }
            Ok(())
        })
        .await
    }

    async fn resume(&self) -> Result<(), ControlApiError> {
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        self.run(FakeOperation::Resume, |state| {
            if state.status == SessionStatus::Paused {
                state.status = SessionStatus::Running;
            }
            Ok(())
        })
        .await
    }

    async fn stop(&self) -> Result<(), ControlApiError> {
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        self.run(FakeOperation::Stop, |state| {
            state.status = SessionStatus::Stopped;
            Ok(())
        })
        .await
    }

    async fn status(&self) -> Result<StatusReport, ControlApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.run(FakeOperation::Status, |state| {
            Ok(StatusReport::new(state.session_id.as_deref(), state.status))
        })
        .await
    }
}

#[async_trait]
impl RobotServerPort for FakeControlServer {
    async fn server_status(&self) -> Result<ServerStatus, ControlApiError> {
        self.run(FakeOperation::ServerStatus, |state| {
            Ok(ServerStatus {
                robots: state
                    .robots
                    .iter()
                    .map(|r| r.robot_type.clone().unwrap_or_else(|| "so-100".to_string()))
                    .collect(),
                robot_status: state.robots.clone(),
            })
        })
        .await
    }
}

#[async_trait]
impl ModelRegistryPort for FakeControlServer {
    async fn list_trained_models(&self) -> Result<Vec<TrainedModel>, ControlApiError> {
        Ok(self.lock().trained_models.clone())
    }

    async fn model_configuration(
        &self,
        _model_id: &str,
        _model_type: &str,
    ) -> Result<ModelConfiguration, ControlApiError> {
        Ok(self.lock().model_configuration.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control::ModelType;

    #[tokio::test]
    async fn test_second_start_is_rejected_with_active_session() {
        let server = FakeControlServer::new();
        let request = ControlRequest::new("org/act", ModelType::Act);

        let handle = server.start(&request).await.unwrap();
        server.advance_to_running();

        let err = server.start(&request).await.unwrap_err();
        let adopted = err.active_session().unwrap();
        assert_eq!(adopted.id, handle.id);
        assert_eq!(adopted.status, SessionStatus::Running);
        assert_eq!(server.start_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_lost_response_still_applies() {
        let server = FakeControlServer::new();
        server.lose_next_response(FakeOperation::Start);

        let result = server.start(&ControlRequest::new("org/act", ModelType::Act)).await;
        assert!(matches!(result, Err(ControlApiError::Network(_))));
        assert_eq!(server.current().status, SessionStatus::Waiting);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let server = FakeControlServer::new();
        server.fail_next(FakeOperation::Status, ControlApiError::Timeout);

        assert!(server.status().await.is_err());
        assert!(server.status().await.is_ok());
        assert_eq!(server.status_calls(), 2);
    }
}
