use async_trait::async_trait;
use serde_json::{json, Value};

use super::{http_client, post_json, Generation, ProviderSettings, TextGenerator};
use crate::{Error, Result};

const COHERE_BASE: &str = "https://api.cohere.com";

/// Client for Cohere's v2 chat API.
pub(crate) struct CohereClient {
    http: reqwest::Client,
    model: String,
    api_key: String,
    endpoint: String,
}

pub(crate) fn build(settings: &ProviderSettings) -> Result<Box<dyn TextGenerator>> {
    Ok(Box::new(CohereClient {
        http: http_client(&settings.provider)?,
        model: settings.model.clone(),
        api_key: settings.required_key()?,
        endpoint: settings.endpoint(COHERE_BASE, "/v2/chat"),
    }))
}

impl CohereClient {
    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
        })
    }
}

/// Joins the text parts of `message.content`.
fn extract_text(envelope: &Value) -> Result<String> {
    let parts = envelope
        .pointer("/message/content")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::generation("cohere", "response has no message.content"))?;

    let text: String = parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
    if text.is_empty() {
        return Err(Error::generation("cohere", "response content has no text parts"));
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for CohereClient {
    fn provider(&self) -> &str {
        "cohere"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let envelope =
            post_json(&self.http, "cohere", &self.endpoint, Some(&self.api_key), &self.request_body(prompt)).await?;
        extract_text(&envelope).map(Generation::Text)
    }
}
