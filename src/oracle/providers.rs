use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AutofillError, Result};
use crate::oracle::CompletionBackend;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

/// POST `body`, check the status, and decode the JSON reply.
fn post_json(
    provider: &str,
    request: reqwest::blocking::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    let transport = |source| AutofillError::OracleTransport {
        provider: provider.to_string(),
        source,
    };

    let response = request.json(body).send().map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AutofillError::OracleStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    response.json().map_err(transport)
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENDPOINT, Self::DEFAULT_MODEL)
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaBackend {
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434/api/generate";
    pub const DEFAULT_MODEL: &'static str = "qwen2.5:1.5b";

    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            client: http_client(),
        }
    }
}

impl CompletionBackend for OllamaBackend {
    fn provider(&self) -> &str {
        "Ollama"
    }

    fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            system,
            prompt,
            stream: false,
            format: "json",
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| AutofillError::json("encoding Ollama request", e))?;

        let reply = post_json(self.provider(), self.client.post(&self.endpoint), &body)?;
        let parsed: OllamaResponse = serde_json::from_value(reply)
            .map_err(|e| AutofillError::json("decoding Ollama response", e))?;
        Ok(parsed.response)
    }
}

// ============================================================================
// OpenAI Backend
// ============================================================================

pub struct OpenAiBackend {
    pub endpoint: String,
    pub model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiBackend {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1/chat/completions";
    pub const DEFAULT_MODEL: &'static str = "gpt-5-nano";

    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client: http_client(),
        }
    }
}

impl CompletionBackend for OpenAiBackend {
    fn provider(&self) -> &str {
        "OpenAI"
    }

    fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "max_completion_tokens": 20000,
        });

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key);
        let reply = post_json(self.provider(), request, &body)?;

        Ok(reply["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

// ============================================================================
// Anthropic Backend
// ============================================================================

pub struct AnthropicBackend {
    pub endpoint: String,
    pub model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl AnthropicBackend {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1/messages";
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-haiku-latest";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client: http_client(),
        }
    }
}

impl CompletionBackend for AnthropicBackend {
    fn provider(&self) -> &str {
        "Anthropic"
    }

    fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": 8192,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION);
        let reply = post_json(self.provider(), request, &body)?;

        Ok(reply["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

// ============================================================================
// Static Backend (canned reply, no network)
// ============================================================================

/// Returns the same text for every prompt. Used offline and in tests.
pub struct StaticBackend {
    pub response: String,
}

impl StaticBackend {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl CompletionBackend for StaticBackend {
    fn provider(&self) -> &str {
        "Static"
    }

    fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}
