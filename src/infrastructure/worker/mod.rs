//! Worker Layer - Background Tasks
//!
//! 实现 StatusPoller，周期性对账服务端会话状态

mod status_poller;

pub use status_poller::{StatusPoller, StatusPollerConfig, StatusPollerHandle};
