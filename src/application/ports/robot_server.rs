//! Robot Server Port - 服务端/机器人状态查询

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ControlApiError;
use crate::domain::control::ConnectedRobot;

/// `/status` 返回的服务端状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// 已连接机器人名称
    #[serde(default)]
    pub robots: Vec<String>,
    /// 每台机器人的详细状态
    #[serde(default)]
    pub robot_status: Vec<ConnectedRobot>,
}

impl ServerStatus {
    pub fn has_robots(&self) -> bool {
        !self.robots.is_empty() || !self.robot_status.is_empty()
    }
}

/// Robot Server Port
#[async_trait]
pub trait RobotServerPort: Send + Sync {
    async fn server_status(&self) -> Result<ServerStatus, ControlApiError>;
}
