//! Configuration for the search and completion services
//!
//! Loads configuration from config.yml file. Values of the form `${VAR}`
//! are resolved through the environment; explicit env keys are consulted
//! as a fallback.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_SOURCEPAGE_FIELD: &str = "sourcepage";
pub const DEFAULT_CONTENT_FIELD: &str = "content";
pub const DEFAULT_SEMANTIC_CONFIGURATION: &str = "default";
pub const DEFAULT_QUERY_LANGUAGE: &str = "en-us";
pub const DEFAULT_QUERY_SPELLER: &str = "lexicon";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    search: Option<SearchSection>,
    openai: Option<OpenAISection>,
}

#[derive(Debug, Deserialize)]
struct SearchSection {
    endpoint: Option<String>,
    api_key: Option<String>,
    index: Option<String>,
    sourcepage_field: Option<String>,
    content_field: Option<String>,
    semantic_configuration: Option<String>,
    query_language: Option<String>,
    query_speller: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAISection {
    endpoint: Option<String>,
    api_key: Option<String>,
    chatgpt_deployment: Option<String>,
    gpt_deployment: Option<String>,
    chatgpt_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub search_endpoint: String,
    pub search_api_key: String,
    pub search_index: String,
    pub sourcepage_field: String,
    pub content_field: String,
    pub semantic_configuration: String,
    pub query_language: String,
    pub query_speller: String,
    pub openai_endpoint: String,
    pub openai_api_key: String,
    pub chatgpt_deployment: String,
    pub gpt_deployment: String,
    pub chatgpt_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

        let search = yaml.search.unwrap_or(SearchSection {
            endpoint: None,
            api_key: None,
            index: None,
            sourcepage_field: None,
            content_field: None,
            semantic_configuration: None,
            query_language: None,
            query_speller: None,
        });

        let openai = yaml.openai.unwrap_or(OpenAISection {
            endpoint: None,
            api_key: None,
            chatgpt_deployment: None,
            gpt_deployment: None,
            chatgpt_model: None,
            max_tokens: None,
            temperature: None,
        });

        // Resolve values with env var precedence
        let search_endpoint = Self::resolve_env_string(search.endpoint, "SEARCH_ENDPOINT");
        let search_api_key = Self::resolve_env_string(search.api_key, "SEARCH_API_KEY");
        let search_index = Self::resolve_env_string(search.index, "SEARCH_INDEX");
        let openai_endpoint = Self::resolve_env_string(openai.endpoint, "OPENAI_ENDPOINT");
        let openai_api_key = Self::resolve_env_string(openai.api_key, "OPENAI_API_KEY");
        let chatgpt_deployment =
            Self::resolve_env_string(openai.chatgpt_deployment, "CHATGPT_DEPLOYMENT");
        let gpt_deployment = Self::resolve_env_string(openai.gpt_deployment, "GPT_DEPLOYMENT");

        Ok(Self {
            search_endpoint,
            search_api_key,
            search_index,
            sourcepage_field: search
                .sourcepage_field
                .unwrap_or_else(|| DEFAULT_SOURCEPAGE_FIELD.to_string()),
            content_field: search
                .content_field
                .unwrap_or_else(|| DEFAULT_CONTENT_FIELD.to_string()),
            semantic_configuration: search
                .semantic_configuration
                .unwrap_or_else(|| DEFAULT_SEMANTIC_CONFIGURATION.to_string()),
            query_language: search
                .query_language
                .unwrap_or_else(|| DEFAULT_QUERY_LANGUAGE.to_string()),
            query_speller: search
                .query_speller
                .unwrap_or_else(|| DEFAULT_QUERY_SPELLER.to_string()),
            openai_endpoint,
            openai_api_key,
            chatgpt_deployment,
            gpt_deployment,
            chatgpt_model: openai
                .chatgpt_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            openai_max_tokens: openai.max_tokens.unwrap_or(1024),
            openai_temperature: openai.temperature.unwrap_or(0.7),
        })
    }

    /// Create config with empty defaults (fallback)
    /// User MUST provide config.yml with actual endpoints and keys
    fn defaults() -> Self {
        Self {
            search_endpoint: String::new(),
            search_api_key: String::new(),
            search_index: String::new(),
            sourcepage_field: DEFAULT_SOURCEPAGE_FIELD.to_string(),
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
            semantic_configuration: DEFAULT_SEMANTIC_CONFIGURATION.to_string(),
            query_language: DEFAULT_QUERY_LANGUAGE.to_string(),
            query_speller: DEFAULT_QUERY_SPELLER.to_string(),
            openai_endpoint: String::new(),
            openai_api_key: String::new(),
            chatgpt_deployment: String::new(),
            gpt_deployment: String::new(),
            chatgpt_model: DEFAULT_CHAT_MODEL.to_string(),
            openai_max_tokens: 1024,
            openai_temperature: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{LazyLock, Mutex};
    use tempfile::NamedTempFile;

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(v) => std::env::set_var(&self.key, v),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_defaults_have_field_names() {
        let config = Config::defaults();
        assert_eq!(config.sourcepage_field, "sourcepage");
        assert_eq!(config.content_field, "content");
        assert_eq!(config.semantic_configuration, "default");
        assert_eq!(config.query_language, "en-us");
        assert_eq!(config.query_speller, "lexicon");
        assert_eq!(config.openai_max_tokens, 1024);
    }

    #[test]
    fn test_load_from_file_reads_sections() {
        let _lock = ENV_LOCK.lock().unwrap();
        let file = write_config(
            r#"
search:
  endpoint: "https://search.example.net"
  api_key: "sk-search"
  index: "docs"
  sourcepage_field: "page"
openai:
  endpoint: "https://openai.example.net"
  api_key: "sk-openai"
  chatgpt_deployment: "chat"
  gpt_deployment: "davinci"
  temperature: 0.2
"#,
        );

        let config = Config::load_from_file(file.path()).expect("load config");

        assert_eq!(config.search_endpoint, "https://search.example.net");
        assert_eq!(config.search_index, "docs");
        assert_eq!(config.sourcepage_field, "page");
        assert_eq!(config.content_field, "content"); // default kept
        assert_eq!(config.chatgpt_deployment, "chat");
        assert_eq!(config.gpt_deployment, "davinci");
        assert!((config.openai_temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_env_placeholder_resolution() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("DOCCHAT_TEST_SEARCH_KEY", "from-env");
        let file = write_config(
            r#"
search:
  api_key: "${DOCCHAT_TEST_SEARCH_KEY}"
"#,
        );

        let config = Config::load_from_file(file.path()).expect("load config");
        assert_eq!(config.search_api_key, "from-env");
    }

    #[test]
    fn test_env_fallback_key_resolution() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("SEARCH_INDEX", "env-index");
        let file = write_config("openai:\n  max_tokens: 256\n");

        let config = Config::load_from_file(file.path()).expect("load config");
        assert_eq!(config.search_index, "env-index");
        assert_eq!(config.openai_max_tokens, 256);
    }

    #[test]
    fn test_unresolved_placeholder_falls_back_to_literal() {
        let _lock = ENV_LOCK.lock().unwrap();
        let file = write_config(
            r#"
search:
  endpoint: "${DOCCHAT_TEST_MISSING_VAR_12345}"
"#,
        );

        let config = Config::load_from_file(file.path()).expect("load config");
        // No env var and no fallback key set: the literal placeholder remains
        assert_eq!(config.search_endpoint, "${DOCCHAT_TEST_MISSING_VAR_12345}");
    }

    #[test]
    fn test_load_from_missing_file_is_config_error() {
        let err = Config::load_from_file("nonexistent_config_12345.yml").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_invalid_yaml_is_config_error() {
        let file = write_config("search: [not a mapping");
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_clone() {
        let config = Config::defaults();
        let cloned = config.clone();
        assert_eq!(config.chatgpt_model, cloned.chatgpt_model);
    }
}
