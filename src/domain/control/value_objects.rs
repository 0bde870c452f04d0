//! Control Context - Value Objects

use serde::{Deserialize, Serialize};

/// 控制会话唯一标识（服务端生成，客户端不解析其内容）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话状态
///
/// `Error` 只存在于客户端：服务端从不上报该状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Stopped,
    Waiting,
    Running,
    Paused,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Stopped => "stopped",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(SessionStatus::Stopped),
            "waiting" => Some(SessionStatus::Waiting),
            "running" => Some(SessionStatus::Running),
            "paused" => Some(SessionStatus::Paused),
            "error" => Some(SessionStatus::Error),
            _ => None,
        }
    }

    /// 服务端控制循环是否存活（包括等待启动与暂停）
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::Waiting | SessionStatus::Running | SessionStatus::Paused
        )
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Stopped
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 会话句柄：启动成功或接管已有会话时创建
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: SessionId,
    pub status: SessionStatus,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            id: SessionId::new(id),
            status,
        }
    }
}

/// 服务端上报的会话状态（轮询结果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub id: Option<SessionId>,
    pub status: SessionStatus,
}

impl StatusReport {
    pub fn new(id: Option<&str>, status: SessionStatus) -> Self {
        Self {
            id: id.map(SessionId::new),
            status,
        }
    }
}

/// 模型类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "ACT")]
    Act,
    #[serde(rename = "ACT_BBOX")]
    ActBbox,
    #[serde(rename = "gr00t")]
    Gr00t,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Act => "ACT",
            ModelType::ActBbox => "ACT_BBOX",
            ModelType::Gr00t => "gr00t",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACT" | "act" => Some(ModelType::Act),
            "ACT_BBOX" | "act_bbox" => Some(ModelType::ActBbox),
            "gr00t" | "GR00T" => Some(ModelType::Gr00t),
            _ => None,
        }
    }

    /// 需要文本 prompt 的模型
    pub fn requires_prompt(&self) -> bool {
        matches!(self, ModelType::ActBbox | ModelType::Gr00t)
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::ActBbox
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 数据集中关节角度的单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngleFormat {
    #[serde(rename = "degrees")]
    Degrees,
    #[serde(rename = "rad", alias = "radians")]
    Radians,
    /// 自定义区间，需要 min_angle / max_angle
    #[serde(rename = "other", alias = "custom")]
    Custom,
}

impl AngleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AngleFormat::Degrees => "degrees",
            AngleFormat::Radians => "rad",
            AngleFormat::Custom => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "degrees" => Some(AngleFormat::Degrees),
            "rad" | "radians" => Some(AngleFormat::Radians),
            "other" | "custom" => Some(AngleFormat::Custom),
            _ => None,
        }
    }
}

impl Default for AngleFormat {
    fn default() -> Self {
        AngleFormat::Radians
    }
}

/// 服务端报告的已连接机器人
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectedRobot {
    /// 设备标识（串口序列号等），部分机器人没有
    pub device_name: Option<String>,
    pub robot_type: Option<String>,
}

impl ConnectedRobot {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: Some(device_name.into()),
            robot_type: None,
        }
    }
}
