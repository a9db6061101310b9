//! Layered configuration — JSON config file plus environment overrides.
//!
//! Every field has a default so the binary runs with zero configuration.
//! The config file path comes from `KRISHI_CONFIG` (default
//! `./app.config.json`); a missing file just means defaults.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub branding: Branding,
    pub features: Features,
    pub chat: ChatTiming,
    pub data: DataConfig,
    pub server: ServerConfig,
    pub llm: LlmSettings,
}

/// Branding strings shown in the welcome message and CLI banner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub app_name: String,
    pub tagline: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            app_name: "KrishiBot".to_string(),
            tagline: "Your AI-Powered Farming Assistant".to_string(),
        }
    }
}

/// Feature flags controlling which guided-flow suggestions are offered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Features {
    pub weather_module: bool,
    pub schemes_module: bool,
    pub plant_protection_module: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            weather_module: true,
            schemes_module: true,
            plant_protection_module: true,
        }
    }
}

/// Typing-indicator delays for the chat and guided flows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatTiming {
    /// Base typing delay before a bot reply, in milliseconds.
    pub typing_delay_ms: u64,
    /// Extra random delay added on top of the base, in milliseconds.
    pub typing_jitter_ms: u64,
    /// Typing delay before a scheme-detail card.
    pub scheme_detail_delay_ms: u64,
    /// Typing delay before a diagnosis message.
    pub diagnosis_delay_ms: u64,
}

impl Default for ChatTiming {
    fn default() -> Self {
        Self {
            typing_delay_ms: 1000,
            typing_jitter_ms: 1000,
            scheme_detail_delay_ms: 1500,
            diagnosis_delay_ms: 2000,
        }
    }
}

impl ChatTiming {
    /// Zero-delay profile for tests and headless use.
    pub fn instant() -> Self {
        Self {
            typing_delay_ms: 0,
            typing_jitter_ms: 0,
            scheme_detail_delay_ms: 0,
            diagnosis_delay_ms: 0,
        }
    }

    /// Base typing delay as a `Duration`.
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn scheme_detail_delay(&self) -> Duration {
        Duration::from_millis(self.scheme_detail_delay_ms)
    }

    pub fn diagnosis_delay(&self) -> Duration {
        Duration::from_millis(self.diagnosis_delay_ms)
    }
}

/// Data-service behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Whether the static data services simulate network latency.
    pub simulate_latency: bool,
    /// Location used for weather queries when the caller does not pass one.
    pub default_location: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            simulate_latency: true,
            default_location: "Delhi".to_string(),
        }
    }
}

/// HTTP/WebSocket server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Optional LLM backend. The LLM engine is only used when `enabled` is true
/// AND an API key is present; otherwise the mock engine answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration: file (if present) then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("KRISHI_CONFIG").unwrap_or_else(|_| "./app.config.json".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Apply environment-variable overrides on top of the loaded values.
    fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var("KRISHI_BIND") {
            self.server.bind_addr = bind;
        }
        if let Ok(use_llm) = std::env::var("KRISHI_USE_LLM") {
            self.llm.enabled = use_llm == "true" || use_llm == "1";
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.llm.api_key = Some(SecretString::from(key));
            }
        }
        if let Ok(base_url) = std::env::var("KRISHI_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Ok(model) = std::env::var("KRISHI_LLM_MODEL") {
            self.llm.model = model;
        }
    }
}
