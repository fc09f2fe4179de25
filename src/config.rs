use crate::error::{LegendaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Speech-recognition backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// whisper.cpp running in-process (requires the `local` feature).
    Local,
    /// OpenAI hosted Whisper API.
    #[default]
    OpenAi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Local => write!(f, "local"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Provider::Local),
            "openai" | "whisper" => Ok(Provider::OpenAi),
            _ => Err(format!("Unknown provider: {}. Use 'local' or 'openai'", s)),
        }
    }
}

impl Provider {
    /// Whether this build can construct the provider.
    pub fn is_available(&self) -> bool {
        match self {
            Provider::Local => cfg!(feature = "local"),
            Provider::OpenAi => true,
        }
    }
}

/// Machine-translation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    #[default]
    Google,
    Gemini,
}

impl std::fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorKind::Google => write!(f, "google"),
            TranslatorKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for TranslatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(TranslatorKind::Google),
            "gemini" => Ok(TranslatorKind::Gemini),
            _ => Err(format!(
                "Unknown translator: {}. Use 'google' or 'gemini'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub provider: Provider,
    pub translator: TranslatorKind,
    /// ggml model file used by the local provider.
    pub model_path: PathBuf,
    /// Inference threads for the local provider.
    pub threads: usize,
    /// Translation requests in flight at once.
    pub concurrency: usize,
    pub source_language: String,
    pub target_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            provider: Provider::default(),
            translator: TranslatorKind::default(),
            model_path: default_model_path(),
            threads: default_threads(),
            concurrency: 4,
            source_language: "en".to_string(),
            target_language: "pt-BR".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    LegendaError::Config(format!("{}: {}", config_path.display(), e))
                })?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Ok(provider) = std::env::var("LEGENDA_PROVIDER") {
            if let Ok(p) = provider.parse() {
                self.provider = p;
            }
        }
        if let Ok(translator) = std::env::var("LEGENDA_TRANSLATOR") {
            if let Ok(t) = translator.parse() {
                self.translator = t;
            }
        }
        if let Ok(model) = std::env::var("LEGENDA_MODEL") {
            self.model_path = PathBuf::from(model);
        }
        if let Ok(threads) = std::env::var("LEGENDA_THREADS") {
            if let Ok(t) = threads.parse() {
                self.threads = t;
            }
        }
        if let Ok(concurrency) = std::env::var("LEGENDA_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.provider {
            Provider::Local => {
                if !self.provider.is_available() {
                    return Err(LegendaError::Config(
                        "The local provider is not compiled in. Rebuild with --features local"
                            .to_string(),
                    ));
                }
            }
            Provider::OpenAi => {
                if self.openai_api_key.is_none() {
                    return Err(LegendaError::Config(
                        "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                            .to_string(),
                    ));
                }
            }
        }

        if self.translator == TranslatorKind::Gemini && self.gemini_api_key.is_none() {
            return Err(LegendaError::Config(
                "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                    .to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(LegendaError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.threads == 0 {
            return Err(LegendaError::Config(
                "Threads must be greater than 0".to_string(),
            ));
        }

        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(LegendaError::Config(
                "Source and target languages must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("legenda").join("config.toml"))
    }
}

fn default_model_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("legenda")
        .join("models")
        .join("ggml-large-v2.bin")
}

/// All cores but two, and never fewer than one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Local);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("WHISPER".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("unknown".parse::<Provider>().is_err());
    }

    #[test]
    fn test_translator_parsing() {
        assert_eq!(
            "google".parse::<TranslatorKind>().unwrap(),
            TranslatorKind::Google
        );
        assert_eq!(
            "Gemini".parse::<TranslatorKind>().unwrap(),
            TranslatorKind::Gemini
        );
        assert!("deepl".parse::<TranslatorKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.translator, TranslatorKind::Google);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.source_language, "en");
        assert_eq!(config.target_language, "pt-BR");
        assert!(config.threads >= 1);
        assert!(config.model_path.ends_with("ggml-large-v2.bin"));
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            translator: TranslatorKind::Gemini,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_with_api_key() {
        let mut config = Config {
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        config.translator = TranslatorKind::Gemini;
        config.gemini_api_key = Some("test-key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config {
            openai_api_key: Some("sk-test".to_string()),
            concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.concurrency = 1;
        config.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_local_provider_matches_features() {
        let config = Config {
            provider: Provider::Local,
            ..Config::default()
        };
        assert_eq!(config.validate().is_ok(), cfg!(feature = "local"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("translator = \"gemini\"\nconcurrency = 2\n").unwrap();
        assert_eq!(config.translator, TranslatorKind::Gemini);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.target_language, "pt-BR");
    }
}
