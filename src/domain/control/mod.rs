//! Control Context - AI 控制会话限界上下文
//!
//! 职责:
//! - 启动请求（ControlRequest）及其校验
//! - 会话状态机与轮询对账

mod errors;
mod request;
mod state_machine;
mod validator;
mod value_objects;

pub use errors::ValidationError;
pub use request::ControlRequest;
pub use state_machine::{
    Admission, ControlAction, ControlAvailability, PollOutcome, PollTicket, SessionSnapshot,
    SessionStateMachine, TransitionError,
};
pub use validator::validate;
pub use value_objects::{
    AngleFormat, ConnectedRobot, ModelType, SessionHandle, SessionId, SessionStatus, StatusReport,
};
