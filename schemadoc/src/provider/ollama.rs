use async_trait::async_trait;
use serde_json::{json, Value};

use super::{http_client, post_json, Generation, ProviderSettings, TextGenerator};
use crate::{Error, Result};

const OLLAMA_BASE: &str = "http://localhost:11434";

/// Client for a local or remote Ollama server. No credential needed.
pub(crate) struct OllamaClient {
    http: reqwest::Client,
    model: String,
    endpoint: String,
}

pub(crate) fn build(settings: &ProviderSettings) -> Result<Box<dyn TextGenerator>> {
    Ok(Box::new(OllamaClient {
        http: http_client(&settings.provider)?,
        model: settings.model.clone(),
        endpoint: settings.endpoint(OLLAMA_BASE, "/api/chat"),
    }))
}

impl OllamaClient {
    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "format": "json",
            "options": { "temperature": 0.0 },
        })
    }
}

fn extract_text(envelope: &Value) -> Result<String> {
    envelope
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::generation("ollama", "response has no message.content"))
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let envelope = post_json(&self.http, "ollama", &self.endpoint, None, &self.request_body(prompt)).await?;
        extract_text(&envelope).map(Generation::Text)
    }
}
