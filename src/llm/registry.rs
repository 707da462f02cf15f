use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::config::LlmConfig;
use crate::errors::{GridPilotError, GridPilotResult};
use crate::llm::provider::VisionProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Registry of all available vision providers, keyed by their config.toml
/// identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VisionProvider>>,
    active: String,
    /// Kept for model/temperature lookups (does not need to be mutable after init).
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
            llm_config: LlmConfig::default(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn VisionProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> GridPilotResult<Arc<dyn VisionProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            GridPilotError::Config(format!(
                "Active provider '{}' not found in registry",
                self.active
            ))
        })
    }

    pub fn set_active(&mut self, name: String) -> GridPilotResult<()> {
        if self.providers.contains_key(&name) {
            self.active = name;
            Ok(())
        } else {
            Err(GridPilotError::Config(format!(
                "Provider '{name}' not registered"
            )))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Active provider plus its per-call parameters from config.
    pub fn call_config(&self) -> GridPilotResult<(Arc<dyn VisionProvider>, CallConfig)> {
        let provider = self.get_active()?;
        let entry = self.llm_config.providers.get(&self.active);
        let (model, temperature) = entry
            .map(|p| (p.model.clone(), p.temperature))
            .unwrap_or_else(|| (String::new(), 0.1));
        Ok((provider, CallConfig { model, temperature }))
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `GRIDPILOT_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.llm.active_provider.clone(),
            llm_config: config.llm.clone(),
        };
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("GRIDPILOT_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            let provider =
                OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        registry
    }
}
