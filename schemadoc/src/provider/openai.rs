use async_trait::async_trait;
use serde_json::{json, Value};

use super::{http_client, post_json, Generation, ProviderSettings, TextGenerator};
use crate::{Error, Result};

const OPENAI_BASE: &str = "https://api.openai.com";
const HUGGINGFACE_BASE: &str = "https://router.huggingface.co";
const CHAT_COMPLETIONS: &str = "/v1/chat/completions";

/// Client for OpenAI-style `/v1/chat/completions` endpoints.
///
/// OpenAI itself and the Hugging Face inference router speak the same protocol;
/// only the endpoint and JSON-mode support differ.
pub(crate) struct ChatCompletionsClient {
    http: reqwest::Client,
    provider: String,
    model: String,
    api_key: String,
    endpoint: String,
    json_mode: bool,
}

pub(crate) fn build_openai(settings: &ProviderSettings) -> Result<Box<dyn TextGenerator>> {
    Ok(Box::new(ChatCompletionsClient::new(settings, OPENAI_BASE, true)?))
}

pub(crate) fn build_huggingface(settings: &ProviderSettings) -> Result<Box<dyn TextGenerator>> {
    Ok(Box::new(ChatCompletionsClient::new(settings, HUGGINGFACE_BASE, false)?))
}

impl ChatCompletionsClient {
    fn new(settings: &ProviderSettings, default_base: &str, json_mode: bool) -> Result<Self> {
        Ok(Self {
            http: http_client(&settings.provider)?,
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            api_key: settings.required_key()?,
            endpoint: settings.endpoint(default_base, CHAT_COMPLETIONS),
            json_mode,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if self.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

/// Pulls `choices[0].message.content` out of a chat completion.
pub(crate) fn extract_text(provider: &str, envelope: &Value) -> Result<String> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::generation(provider, "response has no choices[0].message.content"))
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let envelope =
            post_json(&self.http, &self.provider, &self.endpoint, Some(&self.api_key), &self.request_body(prompt)).await?;
        extract_text(&self.provider, &envelope).map(Generation::Text)
    }
}
