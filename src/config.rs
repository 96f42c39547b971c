//! Configuration management for MedChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MedchatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables consulted, in order, for the provider credential
pub const API_KEY_ENV_VARS: [&str; 3] = ["MEDCHAT_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Main configuration structure for MedChat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Chat session behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// Specifies which hosted model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

fn default_provider_type() -> String {
    "gemini".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// API key; usually supplied through the environment instead
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// System instruction sent with every exchange
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Optional whole-request timeout; unset means wait indefinitely
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Disclaimer appended to assistant answers and shown in the greeting
pub const MEDICAL_DISCLAIMER: &str = "Disclaimer: I am an AI assistant and not a medical professional. This information is not a substitute for professional medical advice. Please consult with a qualified healthcare provider for any health concerns or before making any decisions related to your health.";

fn default_system_instruction() -> String {
    format!(
        "You are MedGemma, a helpful and empathetic AI healthcare assistant. Your knowledge is based on Google's MedGemma model.
- Provide information responsibly and for informational purposes only.
- **Crucially, you must always end your responses with a clear disclaimer: \"{}\"**
- Do not provide diagnoses or prescribe treatments.
- If a user seems to be in a crisis, strongly advise them to contact local emergency services immediately.
- Be supportive, clear, and concise in your communication.",
        MEDICAL_DISCLAIMER
    )
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            api_key: None,
            system_instruction: default_system_instruction(),
            request_timeout_seconds: None,
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Placeholder text shown before the first fragment arrives
    #[serde(default = "default_pending_marker")]
    pub pending_marker: String,

    /// Glyph appended to the running text while a response is streaming
    #[serde(default = "default_cursor_glyph")]
    pub cursor_glyph: String,

    /// Greeting seeded into new interactive sessions (`null` disables it)
    #[serde(default = "default_welcome_message")]
    pub welcome_message: Option<String>,

    /// Largest attachment accepted (bytes)
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

fn default_pending_marker() -> String {
    "...".to_string()
}

fn default_cursor_glyph() -> String {
    "▌".to_string()
}

fn default_welcome_message() -> Option<String> {
    Some(format!(
        "Hello! I'm your MedGemma Health Assistant. You can ask me health-related questions or attach an image or document for analysis. How can I help you today?\n\n**{}**",
        MEDICAL_DISCLAIMER
    ))
}

fn default_max_attachment_bytes() -> u64 {
    20 * 1024 * 1024 // 20 MB inline request limit
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            pending_marker: default_pending_marker(),
            cursor_glyph: default_cursor_glyph(),
            welcome_message: default_welcome_message(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MedchatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MedchatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("MEDCHAT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("MEDCHAT_GEMINI_MODEL") {
            self.provider.gemini.model = model;
        }

        if let Ok(api_base) = std::env::var("MEDCHAT_GEMINI_API_BASE") {
            self.provider.gemini.api_base = api_base;
        }

        if let Ok(limit) = std::env::var("MEDCHAT_MAX_ATTACHMENT_BYTES") {
            if let Ok(v) = limit.parse() {
                self.chat.max_attachment_bytes = v;
            } else {
                tracing::warn!("Invalid MEDCHAT_MAX_ATTACHMENT_BYTES: {}", limit);
            }
        }

        if self.provider.gemini.api_key.is_none() {
            self.provider.gemini.api_key = API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|value| !value.trim().is_empty());
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(model) = cli.command.model_override() {
            tracing::debug!("Using model override: {}", model);
            self.provider.gemini.model = model.to_string();
        }
    }

    /// Validate the configuration
    ///
    /// A missing API key is not a configuration error; it is reported by the
    /// provider when a turn is attempted.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(MedchatError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["gemini"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(MedchatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.gemini.model.trim().is_empty() {
            return Err(MedchatError::Config("gemini.model cannot be empty".to_string()).into());
        }

        if let Err(e) = url::Url::parse(&self.provider.gemini.api_base) {
            return Err(MedchatError::Config(format!(
                "gemini.api_base is not a valid URL: {}",
                e
            ))
            .into());
        }

        if self.provider.gemini.request_timeout_seconds == Some(0) {
            return Err(MedchatError::Config(
                "gemini.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.cursor_glyph.is_empty() {
            return Err(
                MedchatError::Config("chat.cursor_glyph cannot be empty".to_string()).into(),
            );
        }

        if self.chat.max_attachment_bytes == 0 {
            return Err(MedchatError::Config(
                "chat.max_attachment_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 7] = [
        "MEDCHAT_PROVIDER",
        "MEDCHAT_GEMINI_MODEL",
        "MEDCHAT_GEMINI_API_BASE",
        "MEDCHAT_MAX_ATTACHMENT_BYTES",
        "MEDCHAT_API_KEY",
        "GEMINI_API_KEY",
        "API_KEY",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
    }

    fn config_from_env(vars: &[(&str, &str)]) -> Config {
        clear_env();
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "gemini");
        assert_eq!(config.provider.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.chat.pending_marker, "...");
        assert_eq!(config.chat.cursor_glyph, "▌");
        assert!(config.provider.gemini.request_timeout_seconds.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_provider() {
        let mut config = Config::default();
        config.provider.provider_type = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "openai".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid provider type"));
    }

    #[test]
    fn test_config_validation_bad_api_base() {
        let mut config = Config::default();
        config.provider.gemini.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_attachment_limit() {
        let mut config = Config::default();
        config.chat.max_attachment_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_cursor() {
        let mut config = Config::default();
        config.chat.cursor_glyph = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_is_valid_config() {
        let mut config = Config::default();
        config.provider.gemini.api_key = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
provider:
  type: gemini
  gemini:
    model: gemini-2.5-flash
    api_base: http://localhost:8080
    request_timeout_seconds: 90
chat:
  cursor_glyph: "_"
  welcome_message: null
  max_attachment_bytes: 1024
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.provider.gemini.api_base, "http://localhost:8080");
        assert_eq!(config.provider.gemini.request_timeout_seconds, Some(90));
        assert_eq!(config.chat.cursor_glyph, "_");
        assert!(config.chat.welcome_message.is_none());
        assert_eq!(config.chat.max_attachment_bytes, 1024);
        // Unspecified fields keep their defaults
        assert_eq!(config.chat.pending_marker, "...");
        assert!(config
            .provider
            .gemini
            .system_instruction
            .contains("MedGemma"));
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = Config::default();
        config.provider.gemini.api_key = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_system_instruction_demands_disclaimer() {
        let config = GeminiConfig::default();
        assert!(config.system_instruction.contains(MEDICAL_DISCLAIMER));
    }

    #[test]
    #[serial]
    fn test_api_key_prefers_medchat_variable() {
        let config = config_from_env(&[
            ("MEDCHAT_API_KEY", "medchat-key"),
            ("GEMINI_API_KEY", "gemini-key"),
            ("API_KEY", "plain-key"),
        ]);
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some("medchat-key"));
    }

    #[test]
    #[serial]
    fn test_api_key_falls_back_in_order() {
        let config = config_from_env(&[("GEMINI_API_KEY", "gemini-key"), ("API_KEY", "plain-key")]);
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some("gemini-key"));

        let config = config_from_env(&[("API_KEY", "plain-key")]);
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some("plain-key"));

        let config = config_from_env(&[]);
        assert!(config.provider.gemini.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_api_key_skips_blank_values() {
        let config = config_from_env(&[
            ("MEDCHAT_API_KEY", ""),
            ("GEMINI_API_KEY", "   "),
            ("API_KEY", "plain-key"),
        ]);
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some("plain-key"));
    }

    #[test]
    #[serial]
    fn test_api_key_from_file_is_kept() {
        clear_env();
        std::env::set_var("MEDCHAT_API_KEY", "env-key");
        let mut config = Config::default();
        config.provider.gemini.api_key = Some("file-key".to_string());
        config.apply_env_vars();
        clear_env();
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_provider_settings() {
        let config = config_from_env(&[
            ("MEDCHAT_GEMINI_MODEL", "gemini-2.5-flash"),
            ("MEDCHAT_GEMINI_API_BASE", "http://localhost:9999"),
            ("MEDCHAT_MAX_ATTACHMENT_BYTES", "4096"),
        ]);
        assert_eq!(config.provider.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.provider.gemini.api_base, "http://localhost:9999");
        assert_eq!(config.chat.max_attachment_bytes, 4096);
    }

    #[test]
    #[serial]
    fn test_invalid_attachment_limit_is_ignored() {
        let config = config_from_env(&[("MEDCHAT_MAX_ATTACHMENT_BYTES", "twenty megabytes")]);
        assert_eq!(
            config.chat.max_attachment_bytes,
            ChatConfig::default().max_attachment_bytes
        );

        let config = config_from_env(&[("MEDCHAT_MAX_ATTACHMENT_BYTES", "-1")]);
        assert_eq!(
            config.chat.max_attachment_bytes,
            ChatConfig::default().max_attachment_bytes
        );
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        clear_env();
        let cli = crate::cli::Cli::default();
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.provider.provider_type, "gemini");
    }

    #[test]
    #[serial]
    fn test_load_applies_cli_model_override() {
        clear_env();
        let cli = crate::cli::Cli {
            config: None,
            verbose: false,
            command: crate::cli::Commands::Chat {
                model: Some("gemini-2.5-flash".to_string()),
            },
        };
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.provider.gemini.model, "gemini-2.5-flash");
    }
}
