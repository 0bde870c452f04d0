//! Model Query Handlers

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{ModelConfiguration, ModelRegistryPort, TrainedModel};
use crate::application::queries::{GetModelConfiguration, ListTrainedModels};

/// ListTrainedModels Handler
///
/// 只保留训练成功且类型匹配的模型，按请求时间倒序，同名模型只保留最新一条
pub struct ListTrainedModelsHandler {
    registry: Arc<dyn ModelRegistryPort>,
}

impl ListTrainedModelsHandler {
    pub fn new(registry: Arc<dyn ModelRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: ListTrainedModels) -> Result<Vec<String>, ApplicationError> {
        let models = self.registry.list_trained_models().await?;
        let names = select_model_names(models, query.model_type.as_str());

        tracing::debug!(
            model_type = %query.model_type,
            count = names.len(),
            "Trained models listed"
        );

        Ok(names)
    }
}

fn select_model_names(mut models: Vec<TrainedModel>, model_type: &str) -> Vec<String> {
    models.retain(|m| m.model_type == model_type && m.succeeded());
    models.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));

    let mut seen = HashSet::new();
    models
        .into_iter()
        .filter(|m| seen.insert(m.model_name.clone()))
        .map(|m| m.model_name)
        .collect()
}

/// GetModelConfiguration Handler
pub struct GetModelConfigurationHandler {
    registry: Arc<dyn ModelRegistryPort>,
}

impl GetModelConfigurationHandler {
    pub fn new(registry: Arc<dyn ModelRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(
        &self,
        query: GetModelConfiguration,
    ) -> Result<ModelConfiguration, ApplicationError> {
        if query.model_id.trim().is_empty() {
            return Ok(ModelConfiguration::default());
        }

        let configuration = self
            .registry
            .model_configuration(query.model_id.trim(), query.model_type.as_str())
            .await?;

        tracing::debug!(
            model_id = %query.model_id,
            video_keys = configuration.video_keys.len(),
            checkpoints = configuration.checkpoints.len(),
            "Model configuration loaded"
        );

        Ok(configuration)
    }
}
