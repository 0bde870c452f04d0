//! Control Context - 启动请求
//!
//! 显式的启动配置对象，替代全局共享的表单状态

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{AngleFormat, ModelType};

/// AI 控制启动请求
///
/// 不变量:
/// - model_type 需要 prompt 时，prompt 非空
/// - angle_format 为 Custom 时，min_angle / max_angle 必须同时存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub model_id: String,
    #[serde(default)]
    pub prompt: String,
    pub model_type: ModelType,
    pub speed: f32,
    #[serde(rename = "cameras_keys_mapping")]
    pub camera_mapping: Option<BTreeMap<String, u32>>,
    pub selected_camera_id: Option<u32>,
    pub checkpoint: Option<u32>,
    pub angle_format: AngleFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_angle: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f32>,
    /// 不参与 AI 控制的机器人（例如被标记为 leader arm 的机械臂）
    #[serde(rename = "robot_serials_to_ignore")]
    pub excluded_robot_serials: BTreeSet<String>,
}

impl Default for ControlRequest {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            prompt: String::new(),
            model_type: ModelType::default(),
            speed: 1.0,
            camera_mapping: None,
            selected_camera_id: None,
            checkpoint: None,
            angle_format: AngleFormat::default(),
            min_angle: None,
            max_angle: None,
            excluded_robot_serials: BTreeSet::new(),
        }
    }
}

impl ControlRequest {
    pub fn new(model_id: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            model_id: model_id.into(),
            model_type,
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Option<u32>) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_camera_mapping(mut self, mapping: BTreeMap<String, u32>) -> Self {
        self.camera_mapping = Some(mapping);
        self
    }

    pub fn with_selected_camera(mut self, camera_id: u32) -> Self {
        self.selected_camera_id = Some(camera_id);
        self
    }

    /// 设置角度格式；非 Custom 格式会清空角度区间
    pub fn with_angle_format(mut self, format: AngleFormat) -> Self {
        self.angle_format = format;
        if format != AngleFormat::Custom {
            self.min_angle = None;
            self.max_angle = None;
        }
        self
    }

    /// 设置自定义角度区间（同时切换为 Custom 格式）
    pub fn with_custom_angles(mut self, min_angle: f32, max_angle: f32) -> Self {
        self.angle_format = AngleFormat::Custom;
        self.min_angle = Some(min_angle);
        self.max_angle = Some(max_angle);
        self
    }

    /// 切换模型类型
    ///
    /// 模型 ID 与 checkpoint 只对原类型有意义，切换后清空
    pub fn set_model_type(&mut self, model_type: ModelType) {
        if self.model_type == model_type {
            return;
        }
        self.model_type = model_type;
        self.model_id.clear();
        self.checkpoint = None;
    }

    /// 排除机器人（已存在则忽略）
    pub fn exclude_robot(&mut self, serial: impl Into<String>) {
        self.excluded_robot_serials.insert(serial.into());
    }

    pub fn include_robot(&mut self, serial: &str) {
        self.excluded_robot_serials.remove(serial);
    }

    pub fn is_excluded(&self, serial: &str) -> bool {
        self.excluded_robot_serials.contains(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_change_clears_model_and_checkpoint() {
        let mut request = ControlRequest::new("org/act-model", ModelType::Act).with_checkpoint(Some(4000));
        request.set_model_type(ModelType::Gr00t);
        assert!(request.model_id.is_empty());
        assert_eq!(request.checkpoint, None);

        let mut same = ControlRequest::new("org/act-model", ModelType::Act);
        same.set_model_type(ModelType::Act);
        assert_eq!(same.model_id, "org/act-model");
    }

    #[test]
    fn test_angle_bounds_only_serialized_for_custom() {
        let radians = ControlRequest::new("m1", ModelType::Act);
        let json = serde_json::to_value(&radians).unwrap();
        assert!(json.get("min_angle").is_none());
        assert_eq!(json["angle_format"], "rad");

        let custom = ControlRequest::new("m1", ModelType::Act).with_custom_angles(-100.0, 100.0);
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["angle_format"], "other");
        assert_eq!(json["min_angle"], -100.0);

        let back = custom.with_angle_format(AngleFormat::Degrees);
        assert_eq!(back.max_angle, None);
    }

    #[test]
    fn test_excluded_robots_are_a_set() {
        let mut request = ControlRequest::default();
        request.exclude_robot("SO100-A");
        request.exclude_robot("SO100-A");
        assert_eq!(request.excluded_robot_serials.len(), 1);
        request.include_robot("SO100-A");
        assert!(!request.is_excluded("SO100-A"));

        request.exclude_robot("SO100-B");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["robot_serials_to_ignore"][0], "SO100-B");
    }

    #[test]
    fn test_camera_fields_use_wire_names() {
        let request = ControlRequest::new("m1", ModelType::ActBbox)
            .with_camera_mapping(BTreeMap::from([("observation.images.front".to_string(), 1)]))
            .with_selected_camera(1);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["cameras_keys_mapping"]["observation.images.front"], 1);
        assert_eq!(json["selected_camera_id"], 1);

        let json = serde_json::to_value(ControlRequest::default()).unwrap();
        assert!(json["cameras_keys_mapping"].is_null());
    }
}
