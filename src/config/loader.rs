//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "EDUBOTICS";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `EDUBOTICS_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `EDUBOTICS_SERVER__BASE_URL=http://192.168.1.20:80`
/// - `EDUBOTICS_SERVER__TIMEOUT_SECS=10`
/// - `EDUBOTICS_CONTROL__POLL_INTERVAL_MS=500`
/// - `EDUBOTICS_LAUNCH__MODEL_ID=org/pick_place`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）；launch 段没有默认值，未配置时保持 None
    builder = builder
        .set_default("server.base_url", "http://localhost:80")?
        .set_default("server.timeout_secs", 30)?
        .set_default("control.poll_interval_ms", 1000)?
        .set_default("control.stop_on_start_failure", false)?
        .set_default("control.notify_no_robots", true)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let base_url = config.server.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Server base URL cannot be empty".to_string(),
        ));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "Server base URL must use http or https: {}",
            base_url
        )));
    }

    if config.server.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Server timeout cannot be 0".to_string(),
        ));
    }

    if config.control.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll interval cannot be 0".to_string(),
        ));
    }

    if let Some(launch) = &config.launch {
        if launch.parsed_model_type().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Unknown model type: {}",
                launch.model_type
            )));
        }
        if launch.parsed_angle_format().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Unknown angle format: {}",
                launch.angle_format
            )));
        }
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Robot Server: {}", config.server.base_url);
    tracing::info!("Request Timeout: {}s", config.server.timeout_secs);
    tracing::info!("Poll Interval: {}ms", config.control.poll_interval_ms);
    tracing::info!("Stop On Start Failure: {}", config.control.stop_on_start_failure);
    if let Some(launch) = &config.launch {
        tracing::info!("Launch Model: {} ({})", launch.model_id, launch.model_type);
        tracing::info!("Auto Start: {}", launch.auto_start);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchConfig;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_base_url() {
        let mut config = AppConfig::default();
        config.server.base_url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_non_http_base_url() {
        let mut config = AppConfig::default();
        config.server.base_url = "ftp://robot.local".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_poll_interval() {
        let mut config = AppConfig::default();
        config.control.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.server.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_launch_model_type() {
        let mut config = AppConfig::default();
        config.launch = Some(LaunchConfig {
            model_type: "diffusion".to_string(),
            ..Default::default()
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
base_url = "http://robot.local:8020"

[control]
poll_interval_ms = 250
stop_on_start_failure = true

[launch]
model_id = "org/pick_place"
model_type = "ACT"
leader_arm_serials = ["SN-LEADER"]
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.base_url, "http://robot.local:8020");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.control.poll_interval_ms, 250);
        assert!(config.control.stop_on_start_failure);
        assert!(config.control.notify_no_robots);

        let launch = config.launch.unwrap();
        assert_eq!(launch.model_id, "org/pick_place");
        assert_eq!(launch.leader_arm_serials, vec!["SN-LEADER".to_string()]);
        assert!(!launch.auto_start);
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[control]\npoll_interval_ms = 0").unwrap();

        let err = load_config_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
