//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod control_api;
mod model_registry;
mod robot_server;

pub use control_api::{ControlApiError, ControlApiPort};
pub use model_registry::{ModelConfiguration, ModelRegistryPort, TrainedModel};
pub use robot_server::{RobotServerPort, ServerStatus};
