//! Session Coordinator - AI 控制会话编排
//!
//! UI 绑定的应用服务：持有状态机，串联校验、远程调用、轮询对账和事件发布。
//! 状态机锁只在同步代码中持有，从不跨越 `.await`。

use std::sync::{Arc, Mutex};

use crate::application::error::ApplicationError;
use crate::application::ports::{ControlApiError, ControlApiPort, RobotServerPort, ServerStatus};
use crate::domain::control::{
    validate, Admission, ControlAction, ControlAvailability, ControlRequest, PollOutcome,
    SessionHandle, SessionSnapshot, SessionStateMachine, SessionStatus,
};
use crate::infrastructure::events::{ControlEvent, EventPublisher};
use crate::infrastructure::memory::RequestDeduper;
use tokio::sync::broadcast;

/// 轮询请求的去重 key
const STATUS_KEY: &str = "/ai-control/status";

/// 协调器配置
#[derive(Debug, Clone)]
pub struct SessionCoordinatorConfig {
    /// 启动请求传输失败后，额外发送一次 stop 复位服务端
    pub stop_on_start_failure: bool,
    /// 没有已连接机器人时发出警告提示
    pub notify_no_robots: bool,
}

impl Default for SessionCoordinatorConfig {
    fn default() -> Self {
        Self {
            stop_on_start_failure: false,
            notify_no_robots: true,
        }
    }
}

/// 控制操作的确认结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// 服务端已执行
    Applied,
    /// 已处于目标状态，未发送请求
    NoOp,
}

/// 会话协调器
pub struct SessionCoordinator {
    config: SessionCoordinatorConfig,
    machine: Mutex<SessionStateMachine>,
    control_api: Arc<dyn ControlApiPort>,
    robot_server: Arc<dyn RobotServerPort>,
    events: Arc<EventPublisher>,
    deduper: RequestDeduper,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionCoordinatorConfig,
        control_api: Arc<dyn ControlApiPort>,
        robot_server: Arc<dyn RobotServerPort>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            machine: Mutex::new(SessionStateMachine::new()),
            control_api,
            robot_server,
            events,
            deduper: RequestDeduper::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 当前会话快照
    pub fn snapshot(&self) -> SessionSnapshot {
        self.with_machine(|m| m.snapshot())
    }

    pub fn availability(&self) -> ControlAvailability {
        self.snapshot().availability()
    }

    /// 订阅状态变更与提示事件
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    /// 在锁内执行状态机操作；状态变化时发布事件
    fn with_machine<R>(&self, f: impl FnOnce(&mut SessionStateMachine) -> R) -> R {
        let mut machine = self.machine.lock().unwrap_or_else(|e| e.into_inner());
        let before = machine.status();
        let result = f(&mut machine);
        let snapshot = machine.snapshot();
        drop(machine);

        if snapshot.status != before {
            tracing::info!(
                from = %before,
                to = %snapshot.status,
                session_id = ?snapshot.session_id,
                generation = snapshot.generation,
                "Session status changed"
            );
            self.events.publish_status_changed(before, &snapshot);
        }
        result
    }

    // ------------------------------------------------------------------
    // 服务端状态
    // ------------------------------------------------------------------

    /// 获取服务端/机器人状态
    pub async fn refresh_server_status(&self) -> Result<ServerStatus, ApplicationError> {
        let status = self.robot_server.server_status().await?;
        if !status.has_robots() && self.config.notify_no_robots {
            self.events
                .notify_warning("No robots are connected. AI control will not work.");
        }
        Ok(status)
    }

    // ------------------------------------------------------------------
    // start
    // ------------------------------------------------------------------

    /// 启动 AI 控制
    pub async fn start(&self, request: ControlRequest) -> Result<SessionHandle, ApplicationError> {
        let snapshot = self.snapshot();
        if !snapshot.availability().can_start {
            if let Some(action) = self.with_machine(|m| m.pending()) {
                return Err(ApplicationError::Busy(action));
            }
            return Err(ApplicationError::invalid_state(format!(
                "Cannot start while session is {}",
                snapshot.status
            )));
        }

        // 服务端状态不可用时跳过 leader arm 检查
        let robots = match self.refresh_server_status().await {
            Ok(status) => status.robot_status,
            Err(e) => {
                tracing::warn!(error = %e, "Server status unavailable, skipping leader arm check");
                Vec::new()
            }
        };

        if let Err(failures) = validate(&request, &robots) {
            if let Some(first) = failures.first() {
                self.events.notify_error(first.to_string());
            }
            tracing::debug!(failures = ?failures, "Control request rejected by validation");
            return Err(ApplicationError::Validation(failures));
        }

        self.with_machine(|m| m.begin_start())?;

        tracing::info!(
            model_id = %request.model_id,
            model_type = %request.model_type,
            excluded_robots = request.excluded_robot_serials.len(),
            "Starting AI control"
        );

        match self.control_api.start(&request).await {
            Ok(handle) => {
                self.with_machine(|m| m.complete_start(handle.clone()));
                self.events.notify_success("AI control started");
                Ok(handle)
            }
            Err(e) => match e.active_session() {
                Some(handle) => {
                    // 已有会话在运行：接管而不是报错
                    tracing::info!(
                        session_id = %handle.id,
                        status = %handle.status,
                        "AI control already running, adopting session"
                    );
                    self.with_machine(|m| m.complete_start(handle.clone()));
                    self.events.notify_info(format!(
                        "AI control is already running (session {})",
                        handle.id
                    ));
                    Ok(handle)
                }
                None => Err(self.handle_start_failure(e).await),
            },
        }
    }

    async fn handle_start_failure(&self, error: ControlApiError) -> ApplicationError {
        let message = format!("Failed to start AI control: {}", error);

        // 服务端明确给出了结果（拒绝或非 2xx）：会话没有启动
        if !error.outcome_unknown() {
            tracing::warn!(error = %error, "AI control start rejected");
            self.with_machine(|m| m.reject_start(message.clone()));
            self.events.notify_error(message);
            return error.into();
        }

        // 服务端可能已接受请求：进入 error，并重新查询真实状态
        tracing::error!(error = %error, "AI control start failed");
        self.with_machine(|m| m.fail_start(message.clone()));
        self.events.notify_error(message);

        if self.config.stop_on_start_failure {
            if let Err(e) = self.control_api.stop().await {
                tracing::warn!(error = %e, "Reset stop after failed start also failed");
            }
        }
        if let Err(e) = self.requery_status().await {
            tracing::warn!(error = %e, "Status refresh after failed start failed");
        }

        error.into()
    }

    /// 用户确认错误提示：error → stopped
    pub fn acknowledge_error(&self) -> bool {
        self.with_machine(|m| m.acknowledge_error())
    }

    // ------------------------------------------------------------------
    // pause / resume / stop
    // ------------------------------------------------------------------

    pub async fn pause(&self) -> Result<Ack, ApplicationError> {
        self.control(ControlAction::Pause).await
    }

    pub async fn resume(&self) -> Result<Ack, ApplicationError> {
        self.control(ControlAction::Resume).await
    }

    pub async fn stop(&self) -> Result<Ack, ApplicationError> {
        self.control(ControlAction::Stop).await
    }

    async fn control(&self, action: ControlAction) -> Result<Ack, ApplicationError> {
        let call = match action {
            ControlAction::Pause => self.control_api.pause(),
            ControlAction::Resume => self.control_api.resume(),
            ControlAction::Stop => self.control_api.stop(),
            ControlAction::Start => {
                return Err(ApplicationError::internal("start requires a control request"))
            }
        };

        if self.with_machine(|m| m.begin(action))? == Admission::NoOp {
            tracing::debug!(action = %action, "Control action is a no-op in current state");
            return Ok(Ack::NoOp);
        }

        let result = call.await;

        match result {
            Ok(()) => {
                self.with_machine(|m| m.complete(action));
                self.events
                    .notify_success(format!("AI control {} successfully", past_tense(action)));
                Ok(Ack::Applied)
            }
            Err(e) => {
                // 服务端实际效果未知：保留本地状态，等待下一次轮询
                let message = format!("Failed to {} AI control: {}", action, e);
                tracing::warn!(action = %action, error = %e, "AI control request failed");
                self.with_machine(|m| m.fail(action, message.clone()));
                self.events.notify_error(message);
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // 轮询对账
    // ------------------------------------------------------------------

    /// 拉取服务端状态并合并；已有同类请求在途时返回 `Ok(None)`
    pub async fn refresh_status(&self) -> Result<Option<PollOutcome>, ApplicationError> {
        let Some(_guard) = self.deduper.acquire(STATUS_KEY) else {
            return Ok(None);
        };
        self.poll_status().await.map(Some)
    }

    /// 等待在途的状态请求结束，再用新的凭据查询一次
    ///
    /// 在途请求的凭据早于本地转移，其结果会被判定为过期
    async fn requery_status(&self) -> Result<PollOutcome, ApplicationError> {
        let _guard = self
            .deduper
            .acquire_after_in_flight(STATUS_KEY)
            .await
            .ok_or_else(|| ApplicationError::internal("status request slot closed"))?;
        self.poll_status().await
    }

    /// 调用方需持有 STATUS_KEY 的在途登记
    async fn poll_status(&self) -> Result<PollOutcome, ApplicationError> {
        let ticket = self.with_machine(|m| m.begin_poll());
        let report = self.control_api.status().await?;
        let outcome = self.with_machine(|m| m.apply_poll(ticket, report));

        match &outcome {
            PollOutcome::Applied {
                to: SessionStatus::Error,
                ..
            } => {
                tracing::warn!(sequence = ticket.sequence, "Server reported AI control error");
                self.events
                    .notify_error("AI control stopped with an error on the server");
            }
            PollOutcome::Applied { from, to } => {
                tracing::debug!(from = %from, to = %to, sequence = ticket.sequence, "Poll reconciled");
            }
            PollOutcome::Unchanged => {}
            other => {
                tracing::debug!(outcome = ?other, sequence = ticket.sequence, "Poll result discarded");
            }
        }

        Ok(outcome)
    }
}

fn past_tense(action: ControlAction) -> &'static str {
    match action {
        ControlAction::Start => "started",
        ControlAction::Pause => "paused",
        ControlAction::Resume => "resumed",
        ControlAction::Stop => "stopped",
    }
}
