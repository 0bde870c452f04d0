//! 启动请求校验
//!
//! 纯函数，不做任何网络调用；在发出启动请求前同步执行

use super::{AngleFormat, ConnectedRobot, ControlRequest, ValidationError};

/// 校验启动请求
///
/// 按规则顺序返回全部失败项，第一项作为面向用户的提示
pub fn validate(
    request: &ControlRequest,
    connected_robots: &[ConnectedRobot],
) -> Result<(), Vec<ValidationError>> {
    let mut failures = Vec::new();

    if request.model_id.trim().is_empty() {
        failures.push(ValidationError::EmptyModelId);
    }

    if request.model_type.requires_prompt() && request.prompt.trim().is_empty() {
        failures.push(ValidationError::MissingPrompt);
    }

    if let Some(device_name) = leader_arm_conflict(request, connected_robots) {
        failures.push(ValidationError::LeaderArmConflict { device_name });
    }

    if !request.speed.is_finite() || request.speed <= 0.0 {
        failures.push(ValidationError::InvalidSpeed(request.speed));
    }

    if request.angle_format == AngleFormat::Custom {
        match (request.min_angle, request.max_angle) {
            (Some(min), Some(max)) if min >= max => {
                failures.push(ValidationError::InvalidAngleBounds { min, max });
            }
            (Some(_), Some(_)) => {}
            _ => failures.push(ValidationError::MissingAngleBounds),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// 唯一连接的机器人被标记为 leader arm 时返回其设备标识
fn leader_arm_conflict(
    request: &ControlRequest,
    connected_robots: &[ConnectedRobot],
) -> Option<String> {
    match connected_robots {
        [only] => only
            .device_name
            .as_deref()
            .filter(|name| !name.is_empty() && request.is_excluded(name))
            .map(str::to_string),
        _ => None,
    }
}
