//! Gemini-based translation using the Generative AI API.

use crate::error::{LegendaError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Translator using Google Gemini API.
pub struct GeminiTranslator {
    client: Client,
    api_key: String,
    base_url: String,
    source: String,
    target: String,
}

impl GeminiTranslator {
    /// Create a new Gemini translator with the given API key.
    pub fn new(api_key: String, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Point the translator at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            r#"Translate the following subtitle line from {} to {}.
Return ONLY the translated text, nothing else. Preserve all formatting and line breaks.

Text to translate:
{}"#,
            language_code_to_name(&self.source),
            language_code_to_name(&self.target),
            text
        )
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        debug!("Translating {} chars to {} with {}", text.len(), self.target, GEMINI_MODEL);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: self.build_prompt(text),
                }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, GEMINI_MODEL
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
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

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LegendaError::Api(format!("Failed to parse translation response: {}", e))
        })?;

        if let Some(error) = gemini_response.error {
            return Err(LegendaError::Api(format!("Gemini error: {}", error.message)));
        }

        let translated_text = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LegendaError::Translation("Gemini returned no text".to_string()))?;

        Ok(translated_text)
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Convert language code to human-readable name for better prompting.
fn language_code_to_name(code: &str) -> &'static str {
    let lowercase = code.to_lowercase().replace('_', "-");
    match lowercase.as_str() {
        "pt-br" => "Brazilian Portuguese",
        "pt-pt" => "European Portuguese",
        "zh-cn" => "Simplified Chinese",
        "zh-tw" => "Traditional Chinese",
        _ => match lowercase.split('-').next().unwrap_or_default() {
            "en" => "English",
            "es" => "Spanish",
            "fr" => "French",
            "de" => "German",
            "it" => "Italian",
            "pt" => "Portuguese",
            "ru" => "Russian",
            "ja" => "Japanese",
            "ko" => "Korean",
            "zh" => "Chinese",
            "ar" => "Arabic",
            "hi" => "Hindi",
            "nl" => "Dutch",
            "pl" => "Polish",
            "tr" => "Turkish",
            "uk" => "Ukrainian",
            "sv" => "Swedish",
            _ => "the target language",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_translator_creation() {
        let translator = GeminiTranslator::new("test-key".to_string(), "en", "pt-BR");
        assert_eq!(translator.name(), "gemini");
        assert_eq!(translator.source(), "en");
        assert_eq!(translator.target(), "pt-BR");
    }

    #[test]
    fn test_build_prompt() {
        let translator = GeminiTranslator::new("test-key".to_string(), "en", "pt-BR");
        let prompt = translator.build_prompt("Hello, world!");
        assert!(prompt.contains("from English to Brazilian Portuguese"));
        assert!(prompt.contains("Hello, world!"));
    }

    #[test]
    fn test_language_code_to_name() {
        assert_eq!(language_code_to_name("en"), "English");
        assert_eq!(language_code_to_name("pt-BR"), "Brazilian Portuguese");
        assert_eq!(language_code_to_name("es-MX"), "Spanish");
        assert_eq!(language_code_to_name("xyz"), "the target language");
    }
}
