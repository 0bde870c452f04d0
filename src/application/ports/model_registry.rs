//! Model Registry Port - 已训练模型查询
//!
//! 只读查询，用于填充 ControlRequest；不参与会话状态机

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ControlApiError;

/// 训练记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub model_name: String,
    /// 服务端可能返回本 crate 不认识的模型类型，保持原始字符串
    pub model_type: String,
    pub status: String,
    /// ISO-8601 时间字符串，按字典序即可比较先后
    pub requested_at: String,
}

impl TrainedModel {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// 模型配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    #[serde(default)]
    pub video_keys: Vec<String>,
    #[serde(default)]
    pub checkpoints: Vec<String>,
}

impl ModelConfiguration {
    /// 可解析为整数的 checkpoint
    pub fn numeric_checkpoints(&self) -> Vec<u32> {
        self.checkpoints
            .iter()
            .filter_map(|c| c.trim().parse().ok())
            .collect()
    }
}

/// Model Registry Port
#[async_trait]
pub trait ModelRegistryPort: Send + Sync {
    async fn list_trained_models(&self) -> Result<Vec<TrainedModel>, ControlApiError>;

    async fn model_configuration(
        &self,
        model_id: &str,
        model_type: &str,
    ) -> Result<ModelConfiguration, ControlApiError>;
}
