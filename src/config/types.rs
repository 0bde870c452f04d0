//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::domain::control::{AngleFormat, ControlRequest, ModelType};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 机器人服务端配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 会话控制配置
    #[serde(default)]
    pub control: ControlConfig,

    /// 启动参数默认值（可选）
    #[serde(default)]
    pub launch: Option<LaunchConfig>,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 机器人服务端配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 服务端基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:80".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// 会话控制配置
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// 状态轮询间隔（毫秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// 启动请求传输失败后是否尝试停止服务端可能已启动的会话
    #[serde(default)]
    pub stop_on_start_failure: bool,

    /// 服务端没有连接机器人时是否发出警告
    #[serde(default = "default_notify_no_robots")]
    pub notify_no_robots: bool,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_notify_no_robots() -> bool {
    true
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            stop_on_start_failure: false,
            notify_no_robots: default_notify_no_robots(),
        }
    }
}

/// 启动参数默认值
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// 模型 ID
    #[serde(default)]
    pub model_id: String,

    /// 模型类型: ACT, ACT_BBOX, gr00t
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// 文本提示（ACT_BBOX / gr00t 必填）
    #[serde(default)]
    pub prompt: String,

    /// 速度倍率
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// 角度格式: degrees, rad, other
    #[serde(default = "default_angle_format")]
    pub angle_format: String,

    #[serde(default)]
    pub min_angle: Option<f32>,

    #[serde(default)]
    pub max_angle: Option<f32>,

    /// 标记为主臂的机器人序列号（不受 AI 控制）
    #[serde(default)]
    pub leader_arm_serials: Vec<String>,

    /// 启动后是否立即开始会话
    #[serde(default)]
    pub auto_start: bool,
}

fn default_model_type() -> String {
    ModelType::default().as_str().to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_angle_format() -> String {
    AngleFormat::default().as_str().to_string()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            model_type: default_model_type(),
            prompt: String::new(),
            speed: default_speed(),
            angle_format: default_angle_format(),
            min_angle: None,
            max_angle: None,
            leader_arm_serials: Vec::new(),
            auto_start: false,
        }
    }
}

impl LaunchConfig {
    /// 解析后的模型类型，无法识别时为 None
    pub fn parsed_model_type(&self) -> Option<ModelType> {
        ModelType::from_str(&self.model_type)
    }

    /// 解析后的角度格式，无法识别时为 None
    pub fn parsed_angle_format(&self) -> Option<AngleFormat> {
        AngleFormat::from_str(&self.angle_format)
    }

    /// 构建启动请求；模型类型或角度格式无法识别时返回 None
    pub fn to_request(&self) -> Option<ControlRequest> {
        let model_type = self.parsed_model_type()?;
        let angle_format = self.parsed_angle_format()?;

        let mut request = ControlRequest::new(self.model_id.clone(), model_type)
            .with_prompt(self.prompt.clone())
            .with_speed(self.speed);

        request = match (angle_format, self.min_angle, self.max_angle) {
            (AngleFormat::Custom, Some(min), Some(max)) => request.with_custom_angles(min, max),
            (format, _, _) => request.with_angle_format(format),
        };

        for serial in &self.leader_arm_serials {
            request.exclude_robot(serial.clone());
        }
        Some(request)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:80");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.control.poll_interval_ms, 1000);
        assert!(!config.control.stop_on_start_failure);
        assert!(config.control.notify_no_robots);
        assert!(config.launch.is_none());
    }

    #[test]
    fn test_launch_to_request() {
        let launch = LaunchConfig {
            model_id: "org/pick_place".to_string(),
            model_type: "ACT".to_string(),
            leader_arm_serials: vec!["SN-LEADER".to_string()],
            ..Default::default()
        };
        let request = launch.to_request().unwrap();
        assert_eq!(request.model_id, "org/pick_place");
        assert_eq!(request.model_type, ModelType::Act);
        assert_eq!(request.angle_format, AngleFormat::Radians);
        assert!(request.is_excluded("SN-LEADER"));
    }

    #[test]
    fn test_launch_custom_angles() {
        let launch = LaunchConfig {
            model_id: "org/gr00t".to_string(),
            model_type: "gr00t".to_string(),
            prompt: "pick up the cube".to_string(),
            angle_format: "custom".to_string(),
            min_angle: Some(-90.0),
            max_angle: Some(90.0),
            ..Default::default()
        };
        let request = launch.to_request().unwrap();
        assert_eq!(request.angle_format, AngleFormat::Custom);
        assert_eq!(request.min_angle, Some(-90.0));
        assert_eq!(request.max_angle, Some(90.0));
    }

    #[test]
    fn test_launch_unknown_model_type() {
        let launch = LaunchConfig {
            model_type: "diffusion".to_string(),
            ..Default::default()
        };
        assert!(launch.to_request().is_none());
    }
}
