//! Edubotics Control - 远程 AI 控制会话协调器
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Control Context: 启动请求、本地校验、会话状态机
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ControlApi, RobotServer, ModelRegistry）
//! - SessionCoordinator: 会话编排（校验 → 远程调用 → 轮询对账）
//! - Queries: CQRS 查询处理器（已训练模型、模型配置）
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP Control Client, Fake Control Server
//! - Memory: 在途请求去重
//! - Worker: StatusPoller 后台轮询
//! - Events: 状态变更与提示事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
