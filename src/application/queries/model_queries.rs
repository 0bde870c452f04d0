//! Model Queries - 已训练模型与模型配置查询

use crate::domain::control::ModelType;

/// 列出某类型下可用的已训练模型
#[derive(Debug, Clone)]
pub struct ListTrainedModels {
    pub model_type: ModelType,
}

/// 获取模型配置（视频键、checkpoint）
#[derive(Debug, Clone)]
pub struct GetModelConfiguration {
    pub model_id: String,
    pub model_type: ModelType,
}
