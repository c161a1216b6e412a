use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, LlmConfig, RoleEntry};
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::llm::provider::{Classifier, LlmProvider, RoleClassifier};
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Locator,
    Planner,
    Verifier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Locator => "locator",
            Role::Planner => "planner",
            Role::Verifier => "verifier",
        }
    }
}

/// One classifier per role, as handed to the resolver, planner and verifier.
#[derive(Clone)]
pub struct RoleClassifiers {
    pub locator: Arc<dyn Classifier>,
    pub planner: Arc<dyn Classifier>,
    pub verifier: Arc<dyn Classifier>,
}

impl RoleClassifiers {
    /// The same classifier for every role.
    pub fn uniform(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            locator: classifier.clone(),
            planner: classifier.clone(),
            verifier: classifier,
        }
    }
}

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
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

    pub fn with_llm_config(mut self, llm_config: LlmConfig) -> Self {
        self.llm_config = llm_config;
        self
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> SeeDroidResult<Arc<dyn LlmProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            SeeDroidError::Config(format!(
                "Active provider '{}' not found in registry",
                self.active
            ))
        })
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    fn role_entry(&self, role: Role) -> Option<&RoleEntry> {
        let roles = &self.llm_config.roles;
        match role {
            Role::Locator => roles.locator.as_ref(),
            Role::Planner => roles.planner.as_ref(),
            Role::Verifier => roles.verifier.as_ref(),
        }
    }

    /// Return the provider and call configuration for a classifier role.
    ///
    /// Role resolution order:
    /// 1. `[llm.roles.<role>]` in config.toml
    /// 2. Fallback: active provider with its default model / temperature, no streaming
    pub fn call_config_for_role(
        &self,
        role: Role,
    ) -> SeeDroidResult<(Arc<dyn LlmProvider>, CallConfig)> {
        if let Some(entry) = self.role_entry(role) {
            let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
                SeeDroidError::Config(format!(
                    "Role '{}' references unknown provider '{}'",
                    role.as_str(),
                    entry.provider
                ))
            })?;
            let temperature = entry.temperature.unwrap_or_else(|| {
                self.llm_config
                    .providers
                    .get(&entry.provider)
                    .map(|p| p.temperature)
                    .unwrap_or(0.1)
            });
            tracing::debug!(
                role = role.as_str(),
                provider = %entry.provider,
                model = %entry.model,
                stream = entry.stream,
                temperature = temperature,
                "resolved role config"
            );
            return Ok((
                provider,
                CallConfig {
                    model: entry.model.clone(),
                    stream: entry.stream,
                    temperature,
                },
            ));
        }

        let provider = self.get_active()?;
        let (model, temperature) = self
            .llm_config
            .providers
            .get(&self.active)
            .map(|p| (p.model.clone(), p.temperature))
            .unwrap_or_else(|| (String::new(), 0.1));
        tracing::debug!(
            role = role.as_str(),
            provider = %self.active,
            model = %model,
            "role not configured, using active provider fallback"
        );
        Ok((
            provider,
            CallConfig {
                model,
                stream: false,
                temperature,
            },
        ))
    }

    pub fn classifier(&self, role: Role) -> SeeDroidResult<Arc<dyn Classifier>> {
        let (provider, cfg) = self.call_config_for_role(role)?;
        Ok(Arc::new(RoleClassifier::new(provider, cfg)))
    }

    pub fn role_classifiers(&self) -> SeeDroidResult<RoleClassifiers> {
        Ok(RoleClassifiers {
            locator: self.classifier(Role::Locator)?,
            planner: self.classifier(Role::Planner)?,
            verifier: self.classifier(Role::Verifier)?,
        })
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `SEEDROID_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(config.llm.active_provider.clone())
            .with_llm_config(config.llm.clone());
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("SEEDROID_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            if api_key.is_empty() {
                tracing::warn!(provider = %id, "no API key configured");
            }
            let provider = OpenAiCompatibleProvider::new(
                id.clone(),
                entry.api_base.clone(),
                api_key,
                Duration::from_secs(entry.timeout_secs),
            );
            registry.register(Arc::new(provider));
        }
        registry
    }
}
