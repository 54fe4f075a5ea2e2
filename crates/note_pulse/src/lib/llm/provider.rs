use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::llm::{
    openai::OpenAIClient,
    summarizer::{Summarizer, SummarizerFactory},
};

/// An OpenAI-compatible summarization provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    #[serde(default = "ProviderConfig::default_enabled")]
    pub enabled: bool,
}

impl ProviderConfig {
    fn default_enabled() -> bool {
        true
    }

    fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}

/// Read-only provider configuration, loaded once at bootstrap
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
    http_client: reqwest::Client,
}

impl ProviderRegistry {
    pub fn new(providers: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.id.clone(), p)).collect(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Loads a JSON array of [`ProviderConfig`]
    #[tracing::instrument]
    pub async fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read providers file {}", path.display()))?;
        let providers = serde_json::from_str::<Vec<ProviderConfig>>(&contents)
            .with_context(|| format!("Invalid providers file {}", path.display()))?;
        tracing::info!(count = providers.len(), "Loaded providers");
        Ok(Self::new(providers))
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_id)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.values()
    }
}

impl SummarizerFactory for ProviderRegistry {
    fn summarizer(&self, provider_id: &str, model_name: &str) -> Option<Arc<dyn Summarizer>> {
        let provider = self.get(provider_id).filter(|p| p.is_usable())?;
        let client = OpenAIClient::new(&provider.api_key)
            .with_http_client(self.http_client.clone())
            .with_base_url(&provider.base_url)
            .with_chat_model(model_name);
        Some(Arc::new(client))
    }
}
