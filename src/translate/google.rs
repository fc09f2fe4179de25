//! Google Translate through its public web endpoint.

use crate::error::{LegendaError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const GOOGLE_BASE_URL: &str = "https://translate.googleapis.com";

/// The web endpoint rejects longer queries.
const MAX_QUERY_CHARS: usize = 5000;

/// Translator using the keyless Google Translate web endpoint.
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
    source: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: GOOGLE_BASE_URL.to_string(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Point the translator at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Map a BCP 47 tag to the code Google expects.
///
/// Google serves Brazilian Portuguese as plain `pt` and only keeps regions
/// for Chinese.
pub fn google_language_code(tag: &str) -> String {
    let lower = tag.to_lowercase().replace('_', "-");
    match lower.as_str() {
        "zh-cn" | "zh-tw" => {
            let (lang, region) = lower.split_at(2);
            format!("{}{}", lang, region.to_uppercase())
        }
        _ => lower.split('-').next().unwrap_or_default().to_string(),
    }
}

/// Join the translated sentence fragments of a `translate_a/single` reply.
fn parse_response(body: &Value) -> Result<String> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| LegendaError::Translation("No translation in response".to_string()))?;

    Ok(sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect())
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        if text.chars().count() > MAX_QUERY_CHARS {
            return Err(LegendaError::Translation(format!(
                "Text exceeds {} characters",
                MAX_QUERY_CHARS
            )));
        }

        let source = google_language_code(&self.source);
        let target = google_language_code(&self.target);
        debug!("Translating {} chars {} -> {}", text.len(), source, target);

        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| LegendaError::Api(format!("Translation request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LegendaError::Api(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(LegendaError::Api(format!(
                "Translation API error ({}): {}",
                status, body
            )));
        }

        let value: Value = serde_json::from_str(&body)?;
        parse_response(&value)
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
