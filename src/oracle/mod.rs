pub mod prompt;
pub mod providers;
pub mod response;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AutofillError, Result};
use crate::fill::fill_model::{FieldDescriptor, FormMapping};
use crate::oracle::providers::{AnthropicBackend, OllamaBackend, OpenAiBackend, StaticBackend};

// ============================================================================
// Contracts
// ============================================================================

/// What the oracle is asked: the region's descriptors plus the profile keys it
/// may answer with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRequest {
    pub fields: Vec<FieldDescriptor>,
    pub profile_keys: Vec<String>,
}

/// Translates field descriptors into a selector → profile key mapping.
pub trait MappingOracle {
    fn name(&self) -> &str;
    fn get_mapping(&self, request: &MappingRequest) -> Result<FormMapping>;
}

/// Raw text completion from some model provider.
pub trait CompletionBackend {
    fn provider(&self) -> &str;
    fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

// ============================================================================
// LlmOracle: prompt → backend → tolerant parse
// ============================================================================

pub struct LlmOracle {
    backend: Box<dyn CompletionBackend>,
}

impl LlmOracle {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Oracle that always answers with `response`.
    pub fn with_static_response(response: &str) -> Self {
        Self::new(Box::new(StaticBackend::new(response)))
    }
}

impl MappingOracle for LlmOracle {
    fn name(&self) -> &str {
        self.backend.provider()
    }

    fn get_mapping(&self, request: &MappingRequest) -> Result<FormMapping> {
        let prompt = prompt::build_mapping_prompt(request)?;
        debug!(
            provider = self.name(),
            fields = request.fields.len(),
            keys = request.profile_keys.len(),
            "requesting mapping"
        );

        let content = self
            .backend
            .complete(prompt::SYSTEM_PROMPT, &prompt)
            .inspect_err(|e| warn!(provider = self.name(), error = %e, "oracle call failed"))?;

        response::parse_mapping(&content, self.name())
    }
}

// ============================================================================
// Configuration + factory
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// `ollama`, `openai` or `anthropic`.
    pub provider: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: None,
            model: None,
            api_key: None,
        }
    }
}

pub const SUPPORTED_PROVIDERS: [&str; 3] = ["ollama", "openai", "anthropic"];

pub fn build_oracle(config: &OracleConfig) -> Result<Box<dyn MappingOracle>> {
    let backend: Box<dyn CompletionBackend> = match config.provider.to_lowercase().as_str() {
        "ollama" => Box::new(OllamaBackend::new(
            config
                .endpoint
                .as_deref()
                .unwrap_or(OllamaBackend::DEFAULT_ENDPOINT),
            config.model.as_deref().unwrap_or(OllamaBackend::DEFAULT_MODEL),
        )),
        "openai" => {
            let key = required_key(config, "OpenAI")?;
            Box::new(OpenAiBackend::new(
                config
                    .endpoint
                    .as_deref()
                    .unwrap_or(OpenAiBackend::DEFAULT_ENDPOINT),
                config.model.as_deref().unwrap_or(OpenAiBackend::DEFAULT_MODEL),
                key,
            ))
        }
        "anthropic" => {
            let key = required_key(config, "Anthropic")?;
            Box::new(AnthropicBackend::new(
                config
                    .endpoint
                    .as_deref()
                    .unwrap_or(AnthropicBackend::DEFAULT_ENDPOINT),
                config
                    .model
                    .as_deref()
                    .unwrap_or(AnthropicBackend::DEFAULT_MODEL),
                key,
            ))
        }
        other => return Err(AutofillError::UnknownProvider(other.to_string())),
    };
    Ok(Box::new(LlmOracle::new(backend)))
}

fn required_key<'a>(config: &'a OracleConfig, provider: &str) -> Result<&'a str> {
    config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AutofillError::OracleNotConfigured(provider.to_string()))
}
