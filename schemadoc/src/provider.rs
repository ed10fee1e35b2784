//! # Provider Module
//!
//! Text-generation clients and the registry that picks one from a
//! `provider:model` string.
//!
//! Selection only constructs a client; nothing touches the network until
//! [`TextGenerator::generate`] is called.
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::with_defaults()
//!     .register("mistral", Credential::Required, my_mistral_factory);
//! let client = registry.select(&config.llm)?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::{config::LlmConfig, Error, Result};

mod cohere;
mod ollama;
mod openai;

// ============================================================================
// Client Abstraction
// ============================================================================

/// What a provider handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Raw model output, possibly wrapped in code fences or a label.
    Text(String),
    /// Output the client already parsed as JSON.
    Json(Value),
}

/// A single-shot text generation client bound to one provider and model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Registry name of the provider, e.g. `"openai"`.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Sends one prompt and waits for the complete answer. No streaming, no retries.
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}

/// Everything a factory needs to build a client.
#[derive(Clone)]
pub struct ProviderSettings {
    pub provider: String,
    pub model: String,
    /// Always present for providers registered with [`Credential::Required`].
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub(crate) fn endpoint(&self, default_base: &str, path: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or(default_base);
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    pub(crate) fn required_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .ok_or_else(|| Error::Configuration(format!("{} API key is missing; set API_KEY", self.provider)))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Builds a client from resolved settings.
pub type ProviderFactory = Box<dyn Fn(&ProviderSettings) -> Result<Box<dyn TextGenerator>> + Send + Sync>;

/// Whether a provider needs `API_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Required,
    NotRequired,
}

struct Registration {
    credential: Credential,
    factory: ProviderFactory,
}

/// Provider name to client factory mapping.
pub struct ProviderRegistry {
    providers: HashMap<String, Registration>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    /// Registry with the built-in providers: openai, ollama, huggingface, cohere.
    pub fn with_defaults() -> Self {
        Self::new()
            .register("openai", Credential::Required, openai::build_openai)
            .register("ollama", Credential::NotRequired, ollama::build)
            .register("huggingface", Credential::Required, openai::build_huggingface)
            .register("cohere", Credential::Required, cohere::build)
    }

    /// Adds or replaces a provider. Names are matched case-insensitively.
    pub fn register<F>(mut self, name: &str, credential: Credential, factory: F) -> Self
    where
        F: Fn(&ProviderSettings) -> Result<Box<dyn TextGenerator>> + Send + Sync + 'static,
    {
        self.providers.insert(name.trim().to_lowercase(), Registration { credential, factory: Box::new(factory) });
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.providers.contains_key(&name.trim().to_lowercase())
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves `config.model_name` into a client.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an empty or malformed model string, an unknown
    /// provider, or a missing credential. [`Error::ProviderInit`] when the client
    /// itself cannot be constructed.
    pub fn select(&self, config: &LlmConfig) -> Result<Box<dyn TextGenerator>> {
        let (provider, model) = parse_model_name(&config.model_name)?;

        let registration = self.providers.get(&provider).ok_or_else(|| {
            Error::Configuration(format!(
                "unsupported LLM provider '{provider}'; supported providers: {} (e.g. openai:gpt-4o)",
                self.providers().join(", ")
            ))
        })?;

        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);
        if registration.credential == Credential::Required && api_key.is_none() {
            return Err(Error::Configuration(format!("{provider} API key is missing; set API_KEY")));
        }

        let settings = ProviderSettings { provider, model, api_key, base_url: config.base_url.clone() };
        log::info!("Initializing {} model '{}'", settings.provider, settings.model);
        (registration.factory)(&settings)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Splits `"<provider>:<model>"`.
///
/// Surrounding whitespace is ignored and the provider is lower-cased; the model
/// id keeps its case.
pub fn parse_model_name(raw: &str) -> Result<(String, String)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Configuration("LLM_MODEL_NAME is missing; expected '<provider>:<model>'".to_string()));
    }
    let Some((provider, model)) = raw.split_once(':').filter(|(_, model)| !model.contains(':')) else {
        return Err(Error::Configuration(format!(
            "LLM_MODEL_NAME '{raw}' must contain exactly one ':' (e.g. openai:gpt-4o)"
        )));
    };
    let provider = provider.trim().to_lowercase();
    let model = model.trim();
    if provider.is_empty() {
        return Err(Error::Configuration(format!("LLM_MODEL_NAME '{raw}' has an empty provider")));
    }
    if model.is_empty() {
        return Err(Error::Configuration(format!("{provider} model name is missing after '{provider}:'")));
    }
    Ok((provider, model.to_string()))
}

// ============================================================================
// HTTP Plumbing
// ============================================================================

pub(crate) fn http_client(provider: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| Error::ProviderInit { provider: provider.to_string(), reason: e.to_string() })
}

/// POSTs a JSON body and returns the decoded JSON envelope.
pub(crate) async fn post_json(
    http: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    body: &Value,
) -> Result<Value> {
    let mut request = http.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| Error::generation(provider, e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::generation(provider, format!("HTTP {status}: {}", snippet(&text))));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| Error::generation(provider, format!("unreadable response envelope: {e}")))
}

fn snippet(text: &str) -> String {
    const LIMIT: usize = 300;
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
