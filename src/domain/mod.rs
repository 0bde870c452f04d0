//! 领域层 - Control Context
//!
//! 启动请求、本地校验与会话状态机；不依赖任何 I/O

pub mod control;
