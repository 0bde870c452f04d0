//! Session State Machine - AI 控制会话状态机
//!
//! 状态: stopped → waiting → running ⇄ paused → stopped，另有客户端本地的 error
//!
//! 用户操作与轮询结果走同一组转移函数，状态机是会话句柄的唯一写入者。
//!
//! 不变量:
//! - 本地请求在途期间（pending），轮询结果一律不生效
//! - 每次本地转移都会递增 generation；在旧 generation 下发出的轮询被丢弃
//! - 轮询按发出顺序编号，迟到的旧轮询不会覆盖新结果

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{SessionHandle, SessionId, SessionStatus, StatusReport};

/// 服务端上报控制循环出错时记录的提示
const SERVER_ERROR_MESSAGE: &str = "AI control stopped with an error on the server";

/// 用户发起的控制操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
        }
    }

    /// 操作成功后的目标状态
    pub fn target(&self) -> SessionStatus {
        match self {
            ControlAction::Start => SessionStatus::Waiting,
            ControlAction::Pause => SessionStatus::Paused,
            ControlAction::Resume => SessionStatus::Running,
            ControlAction::Stop => SessionStatus::Stopped,
        }
    }
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态转移错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A {0} request is already in flight")]
    Busy(ControlAction),

    #[error("Cannot {action} while session is {status}")]
    InvalidState {
        action: ControlAction,
        status: SessionStatus,
    },
}

/// pause / resume / stop 的准入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 需要向服务端发送请求
    Dispatch,
    /// 已处于目标状态或操作无意义，直接确认
    NoOp,
}

/// 轮询凭据：发出轮询请求前从状态机领取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub sequence: u64,
    pub generation: u64,
}

/// 轮询结果的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Applied {
        from: SessionStatus,
        to: SessionStatus,
    },
    Unchanged,
    /// 本地请求在途
    SuppressedInFlight,
    /// 更新的轮询结果已生效
    OutOfOrder,
    /// 轮询发出后发生过本地转移
    Stale,
    /// 服务端状态无法合并（例如 error 仍待用户确认）
    Ignored,
}

/// 对外展示的会话快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<SessionId>,
    /// 本地请求在途，status 可能是尚未确认的乐观值
    pub pending: bool,
    pub last_error: Option<String>,
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn availability(&self) -> ControlAvailability {
        let idle = !self.pending;
        ControlAvailability {
            can_start: idle && self.status == SessionStatus::Stopped,
            can_pause: idle && self.status == SessionStatus::Running,
            can_resume: idle && self.status == SessionStatus::Paused,
            can_stop: idle && self.status != SessionStatus::Stopped,
            controls_locked: self.pending,
            show_session_panel: self.status != SessionStatus::Stopped,
        }
    }
}

/// UI 按钮可用性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlAvailability {
    pub can_start: bool,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_stop: bool,
    pub controls_locked: bool,
    pub show_session_panel: bool,
}

/// 会话状态机
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    status: SessionStatus,
    session_id: Option<SessionId>,
    pending: Option<ControlAction>,
    last_error: Option<String>,
    generation: u64,
    next_poll_sequence: u64,
    last_applied_poll: u64,
    updated_at: DateTime<Utc>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Stopped,
            session_id: None,
            pending: None,
            last_error: None,
            generation: 0,
            next_poll_sequence: 0,
            last_applied_poll: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn pending(&self) -> Option<ControlAction> {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            pending: self.pending.is_some(),
            last_error: self.last_error.clone(),
            generation: self.generation,
            updated_at: self.updated_at,
        }
    }

    // ------------------------------------------------------------------
    // start
    // ------------------------------------------------------------------

    /// stopped → waiting（乐观状态，等待服务端确认）
    pub fn begin_start(&mut self) -> Result<(), TransitionError> {
        self.ensure_idle()?;
        if self.status != SessionStatus::Stopped {
            return Err(TransitionError::InvalidState {
                action: ControlAction::Start,
                status: self.status,
            });
        }
        self.pending = Some(ControlAction::Start);
        self.session_id = None;
        self.last_error = None;
        self.set_status(SessionStatus::Waiting);
        Ok(())
    }

    /// 启动成功，或服务端返回已在运行的会话：采用服务端给出的句柄
    pub fn complete_start(&mut self, handle: SessionHandle) {
        self.pending = None;
        self.session_id = match handle.status {
            SessionStatus::Stopped => None,
            _ => Some(handle.id),
        };
        self.set_status(handle.status);
    }

    /// 服务端明确拒绝且没有活动会话：回到 stopped
    pub fn reject_start(&mut self, message: impl Into<String>) {
        self.pending = None;
        self.session_id = None;
        self.last_error = Some(message.into());
        self.set_status(SessionStatus::Stopped);
    }

    /// 传输层失败：服务端是否接受未知，进入 error 等待确认与轮询
    pub fn fail_start(&mut self, message: impl Into<String>) {
        self.pending = None;
        self.session_id = None;
        self.last_error = Some(message.into());
        self.set_status(SessionStatus::Error);
    }

    /// 用户确认错误：error → stopped；其他状态下无操作
    pub fn acknowledge_error(&mut self) -> bool {
        if self.status != SessionStatus::Error {
            return false;
        }
        self.last_error = None;
        self.set_status(SessionStatus::Stopped);
        true
    }

    // ------------------------------------------------------------------
    // pause / resume / stop
    // ------------------------------------------------------------------

    /// 判断操作是否需要发请求；需要时标记为在途
    pub fn begin(&mut self, action: ControlAction) -> Result<Admission, TransitionError> {
        let dispatch = match action {
            ControlAction::Start => {
                self.begin_start()?;
                return Ok(Admission::Dispatch);
            }
            ControlAction::Pause => self.status == SessionStatus::Running,
            ControlAction::Resume => self.status == SessionStatus::Paused,
            ControlAction::Stop => self.status != SessionStatus::Stopped,
        };
        self.ensure_idle()?;
        if !dispatch {
            return Ok(Admission::NoOp);
        }

        self.pending = Some(action);
        self.bump();
        Ok(Admission::Dispatch)
    }

    /// 服务端确认操作
    pub fn complete(&mut self, action: ControlAction) {
        self.pending = None;
        self.last_error = None;
        if action == ControlAction::Stop {
            self.session_id = None;
        }
        self.set_status(action.target());
    }

    /// 操作失败：保留当前状态，等待轮询对账
    pub fn fail(&mut self, action: ControlAction, message: impl Into<String>) {
        debug_assert_ne!(action, ControlAction::Start);
        self.pending = None;
        self.last_error = Some(message.into());
        self.bump();
    }

    // ------------------------------------------------------------------
    // polling
    // ------------------------------------------------------------------

    /// 领取轮询凭据
    pub fn begin_poll(&mut self) -> PollTicket {
        self.next_poll_sequence += 1;
        PollTicket {
            sequence: self.next_poll_sequence,
            generation: self.generation,
        }
    }

    /// 合并服务端轮询结果
    pub fn apply_poll(&mut self, ticket: PollTicket, report: StatusReport) -> PollOutcome {
        if self.pending.is_some() {
            return PollOutcome::SuppressedInFlight;
        }
        if ticket.sequence <= self.last_applied_poll {
            return PollOutcome::OutOfOrder;
        }
        if ticket.generation != self.generation {
            return PollOutcome::Stale;
        }
        self.last_applied_poll = ticket.sequence;

        // error 需要用户确认；只有服务端确实在运行时才直接接管
        if self.status == SessionStatus::Error && !report.status.is_active() {
            return PollOutcome::Ignored;
        }
        if report.status == SessionStatus::Error {
            let from = self.status;
            self.session_id = None;
            self.last_error = Some(SERVER_ERROR_MESSAGE.to_string());
            self.set_status(SessionStatus::Error);
            return PollOutcome::Applied {
                from,
                to: SessionStatus::Error,
            };
        }

        let reported_id = match report.status {
            SessionStatus::Stopped => None,
            _ => report.id.or_else(|| self.session_id.clone()),
        };

        if report.status == self.status && reported_id == self.session_id {
            self.updated_at = Utc::now();
            return PollOutcome::Unchanged;
        }

        let from = self.status;
        self.session_id = reported_id;
        if report.status.is_active() {
            self.last_error = None;
        }
        self.set_status(report.status);
        PollOutcome::Applied {
            from,
            to: report.status,
        }
    }

    fn ensure_idle(&self) -> Result<(), TransitionError> {
        match self.pending {
            Some(action) => Err(TransitionError::Busy(action)),
            None => Ok(()),
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.bump();
    }

    fn bump(&mut self) {
        self.generation += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_machine(id: &str) -> SessionStateMachine {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        machine.complete_start(SessionHandle::new(id, SessionStatus::Running));
        machine
    }

    #[test]
    fn test_start_enters_waiting_then_poll_confirms_running() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        assert_eq!(machine.status(), SessionStatus::Waiting);
        assert!(machine.snapshot().pending);

        machine.complete_start(SessionHandle::new("abc", SessionStatus::Waiting));
        assert_eq!(machine.status(), SessionStatus::Waiting);
        assert!(!machine.snapshot().pending);

        let ticket = machine.begin_poll();
        let outcome = machine.apply_poll(ticket, StatusReport::new(Some("abc"), SessionStatus::Running));
        assert_eq!(
            outcome,
            PollOutcome::Applied {
                from: SessionStatus::Waiting,
                to: SessionStatus::Running
            }
        );
        assert_eq!(machine.session_id().map(|id| id.as_str()), Some("abc"));
    }

    #[test]
    fn test_poll_adopts_session_id_while_waiting() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        machine.fail_start("connection reset");
        assert_eq!(machine.status(), SessionStatus::Error);

        // 服务端其实已经接受了启动请求
        let ticket = machine.begin_poll();
        machine.apply_poll(ticket, StatusReport::new(Some("srv-1"), SessionStatus::Running));
        assert_eq!(machine.status(), SessionStatus::Running);
        assert_eq!(machine.session_id().map(|id| id.as_str()), Some("srv-1"));
        assert_eq!(machine.snapshot().last_error, None);
    }

    #[test]
    fn test_error_requires_acknowledgement_when_server_stopped() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        machine.fail_start("timeout");

        let ticket = machine.begin_poll();
        let outcome = machine.apply_poll(ticket, StatusReport::new(None, SessionStatus::Stopped));
        assert_eq!(outcome, PollOutcome::Ignored);
        assert_eq!(machine.status(), SessionStatus::Error);

        assert!(machine.acknowledge_error());
        assert_eq!(machine.status(), SessionStatus::Stopped);
        assert!(!machine.acknowledge_error());
    }

    #[test]
    fn test_already_running_adoption() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        machine.complete_start(SessionHandle::new("existing", SessionStatus::Paused));
        assert_eq!(machine.status(), SessionStatus::Paused);
        assert_eq!(machine.session_id().map(|id| id.as_str()), Some("existing"));
    }

    #[test]
    fn test_pause_resume_stop_cycle() {
        let mut machine = running_machine("abc");

        assert_eq!(machine.begin(ControlAction::Pause), Ok(Admission::Dispatch));
        machine.complete(ControlAction::Pause);
        assert_eq!(machine.status(), SessionStatus::Paused);

        assert_eq!(machine.begin(ControlAction::Resume), Ok(Admission::Dispatch));
        machine.complete(ControlAction::Resume);
        assert_eq!(machine.status(), SessionStatus::Running);

        assert_eq!(machine.begin(ControlAction::Stop), Ok(Admission::Dispatch));
        machine.complete(ControlAction::Stop);
        assert_eq!(machine.status(), SessionStatus::Stopped);
        assert_eq!(machine.session_id(), None);
    }

    #[test]
    fn test_idempotent_operations_are_noops() {
        let mut machine = SessionStateMachine::new();
        let generation = machine.generation();

        assert_eq!(machine.begin(ControlAction::Stop), Ok(Admission::NoOp));
        assert_eq!(machine.begin(ControlAction::Pause), Ok(Admission::NoOp));
        assert_eq!(machine.begin(ControlAction::Resume), Ok(Admission::NoOp));
        assert_eq!(machine.status(), SessionStatus::Stopped);
        assert_eq!(machine.generation(), generation);

        let mut paused = running_machine("abc");
        paused.begin(ControlAction::Pause).unwrap();
        paused.complete(ControlAction::Pause);
        assert_eq!(paused.begin(ControlAction::Pause), Ok(Admission::NoOp));
    }

    #[test]
    fn test_failed_pause_keeps_state() {
        let mut machine = running_machine("abc");
        machine.begin(ControlAction::Pause).unwrap();
        machine.fail(ControlAction::Pause, "network down");

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Running);
        assert!(!snapshot.pending);
        assert_eq!(snapshot.last_error.as_deref(), Some("network down"));
    }

    #[test]
    fn test_requests_are_serialized() {
        let mut machine = running_machine("abc");
        machine.begin(ControlAction::Pause).unwrap();
        assert_eq!(
            machine.begin(ControlAction::Stop),
            Err(TransitionError::Busy(ControlAction::Pause))
        );
        assert!(matches!(
            running_machine("abc").begin_start(),
            Err(TransitionError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_poll_suppressed_while_request_in_flight() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();

        let ticket = machine.begin_poll();
        let outcome = machine.apply_poll(ticket, StatusReport::new(None, SessionStatus::Stopped));
        assert_eq!(outcome, PollOutcome::SuppressedInFlight);
        assert_eq!(machine.status(), SessionStatus::Waiting);
    }

    #[test]
    fn test_poll_issued_before_local_transition_is_stale() {
        let mut machine = running_machine("abc");
        let early = machine.begin_poll();

        machine.begin(ControlAction::Pause).unwrap();
        machine.complete(ControlAction::Pause);

        // 在暂停之前发出的轮询迟到了
        let outcome = machine.apply_poll(early, StatusReport::new(Some("abc"), SessionStatus::Running));
        assert_eq!(outcome, PollOutcome::Stale);
        assert_eq!(machine.status(), SessionStatus::Paused);
    }

    #[test]
    fn test_out_of_order_poll_is_discarded() {
        let mut machine = running_machine("abc");
        let first = machine.begin_poll();
        let second = machine.begin_poll();

        let outcome = machine.apply_poll(second, StatusReport::new(Some("abc"), SessionStatus::Running));
        assert_eq!(outcome, PollOutcome::Unchanged);

        let outcome = machine.apply_poll(first, StatusReport::new(None, SessionStatus::Stopped));
        assert_eq!(outcome, PollOutcome::OutOfOrder);
        assert_eq!(machine.status(), SessionStatus::Running);
    }

    #[test]
    fn test_poll_wins_when_idle() {
        let mut machine = running_machine("abc");
        let ticket = machine.begin_poll();
        machine.apply_poll(ticket, StatusReport::new(Some("abc"), SessionStatus::Stopped));
        assert_eq!(machine.status(), SessionStatus::Stopped);
        assert_eq!(machine.session_id(), None);
    }

    #[test]
    fn test_server_reported_error_is_applied_when_idle() {
        let mut machine = running_machine("abc");
        let ticket = machine.begin_poll();
        let outcome = machine.apply_poll(ticket, StatusReport::new(Some("abc"), SessionStatus::Error));
        assert_eq!(
            outcome,
            PollOutcome::Applied {
                from: SessionStatus::Running,
                to: SessionStatus::Error
            }
        );

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Error);
        assert_eq!(snapshot.session_id, None);
        assert_eq!(snapshot.last_error.as_deref(), Some(SERVER_ERROR_MESSAGE));
        assert!(!snapshot.availability().can_pause);

        // 已在 error 时重复上报不再变化，仍需用户确认
        let ticket = machine.begin_poll();
        let outcome = machine.apply_poll(ticket, StatusReport::new(None, SessionStatus::Error));
        assert_eq!(outcome, PollOutcome::Ignored);
        assert!(machine.acknowledge_error());
        assert_eq!(machine.status(), SessionStatus::Stopped);
    }

    #[test]
    fn test_availability() {
        let mut machine = SessionStateMachine::new();
        let idle = machine.snapshot().availability();
        assert!(idle.can_start);
        assert!(!idle.can_stop);
        assert!(!idle.show_session_panel);

        machine.begin_start().unwrap();
        let waiting = machine.snapshot().availability();
        assert!(waiting.controls_locked);
        assert!(!waiting.can_start);
        assert!(waiting.show_session_panel);

        machine.complete_start(SessionHandle::new("abc", SessionStatus::Running));
        let running = machine.snapshot().availability();
        assert!(running.can_pause);
        assert!(running.can_stop);
        assert!(!running.can_resume);
    }
}
