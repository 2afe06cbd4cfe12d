use crate::core::engine::{
    ReplyMessages, DEFAULT_FAILURE_MESSAGE, DEFAULT_REDACTION_MESSAGE, DEFAULT_REJECTION_MESSAGE,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::core::moderation::{Denylist, DEFAULT_BANNED_KEYWORDS, DEFAULT_PLACEHOLDER};
use crate::core::openrouter::{DEFAULT_MODEL, DEFAULT_REFERER, DEFAULT_TITLE, OPENROUTER_API_URL};
use crate::core::ConfigProvider;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub referer: String,
    pub title: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: OPENROUTER_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub banned_keywords: Vec<String>,
    pub placeholder: String,
    pub system_prompt: String,
    pub rejection_message: String,
    pub redaction_message: String,
    pub failure_message: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            banned_keywords: DEFAULT_BANNED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
            redaction_message: DEFAULT_REDACTION_MESSAGE.to_string(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl RelayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RelayError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENROUTER_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RelayError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 先讀檔（若有），再套用環境變數
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// 環境變數一律覆蓋配置檔：`OPENROUTER_API_KEY` 與 `PORT`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.upstream.api_key = Some(key);
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| RelayError::InvalidConfigValueError {
                    field: PORT_ENV.to_string(),
                    value: port.clone(),
                    reason: "Port must be a number between 1 and 65535".to_string(),
                })?;
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn denylist(&self) -> Result<Denylist> {
        Denylist::new(
            self.moderation.banned_keywords.iter().cloned(),
            self.moderation.placeholder.as_str(),
        )
    }

    pub fn reply_messages(&self) -> ReplyMessages {
        ReplyMessages {
            rejection: self.moderation.rejection_message.clone(),
            redaction: self.moderation.redaction_message.clone(),
            failure: self.moderation.failure_message.clone(),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_range("server.port", self.server.port, 1, u16::MAX)?;

        validation::validate_url("upstream.endpoint", &self.upstream.endpoint)?;
        validation::validate_non_empty_string("upstream.model", &self.upstream.model)?;
        let api_key = validation::validate_required_field("upstream.api_key", &self.upstream.api_key)?;
        validation::validate_non_empty_string("upstream.api_key", api_key)?;
        if api_key.starts_with("${") {
            return Err(RelayError::MissingConfigError {
                field: "upstream.api_key".to_string(),
            });
        }
        if let Some(timeout) = self.upstream.timeout_seconds {
            validation::validate_range("upstream.timeout_seconds", timeout, 1, 600)?;
        }

        validation::validate_keywords("moderation.banned_keywords", &self.moderation.banned_keywords)?;
        validation::validate_non_empty_string("moderation.placeholder", &self.moderation.placeholder)?;

        Ok(())
    }
}

impl ConfigProvider for RelayConfig {
    fn api_endpoint(&self) -> &str {
        &self.upstream.endpoint
    }

    fn api_key(&self) -> &str {
        self.upstream.api_key.as_deref().unwrap_or_default()
    }

    fn model(&self) -> &str {
        &self.upstream.model
    }

    fn referer(&self) -> &str {
        &self.upstream.referer
    }

    fn title(&self) -> &str {
        &self.upstream.title
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.upstream.timeout_seconds
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_key(mut config: RelayConfig) -> RelayConfig {
        config.upstream.api_key = Some("sk-or-test".to_string());
        config
    }

    #[test]
    fn test_defaults_match_original_service() {
        let config = RelayConfig::default();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upstream.endpoint, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(config.upstream.model, "minimax/minimax-m2:free");
        assert_eq!(config.upstream.referer, "http://localhost");
        assert_eq!(config.upstream.title, "Integration Demo");
        assert!(config.upstream.timeout_seconds.is_none());
        assert_eq!(
            config.moderation.banned_keywords,
            vec!["kill", "hack", "bomb", "terror", "attack"]
        );
        assert_eq!(config.moderation.placeholder, "[REDACTED]");
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
port = 8088

[upstream]
model = "openai/gpt-4o-mini"
api_key = "sk-or-file"
timeout_seconds = 30

[moderation]
banned_keywords = ["weapon", "exploit"]
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.model, "openai/gpt-4o-mini");
        assert_eq!(config.upstream.endpoint, OPENROUTER_API_URL);
        assert_eq!(config.upstream.timeout_seconds, Some(30));
        assert_eq!(config.moderation.banned_keywords, vec!["weapon", "exploit"]);
        assert_eq!(config.moderation.placeholder, "[REDACTED]");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RELAY_TEST_ENDPOINT", "https://llm.internal/v1/chat/completions");

        let toml_content = r#"
[upstream]
endpoint = "${RELAY_TEST_ENDPOINT}"
api_key = "${RELAY_TEST_UNSET_KEY}"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.upstream.endpoint, "https://llm.internal/v1/chat/completions");
        assert_eq!(config.upstream.api_key.as_deref(), Some("${RELAY_TEST_UNSET_KEY}"));
        assert!(config.validate().is_err());

        std::env::remove_var("RELAY_TEST_ENDPOINT");
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let config = RelayConfig::default();
        match config.validate() {
            Err(RelayError::MissingConfigError { field }) => assert_eq!(field, "upstream.api_key"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(with_key(config).validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = with_key(RelayConfig::default());
        config.upstream.endpoint = "invalid-url".to_string();
        assert!(config.validate().is_err());

        let mut config = with_key(RelayConfig::default());
        config.moderation.banned_keywords = vec!["kill".to_string(), String::new()];
        assert!(config.validate().is_err());

        let mut config = with_key(RelayConfig::default());
        config.upstream.timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = with_key(RelayConfig::default());
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = RelayConfig::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(RelayError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[server]
host = "127.0.0.1"

[moderation]
placeholder = "***"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = RelayConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");

        let denylist = config.denylist().unwrap();
        assert_eq!(denylist.redact_banned_words("bomb"), "***");
    }

    #[test]
    fn test_reply_messages_follow_config() {
        let mut config = RelayConfig::default();
        config.moderation.redaction_message = "Filtered.".to_string();

        let messages = config.reply_messages();
        assert_eq!(messages.redaction, "Filtered.");
        assert_eq!(messages.rejection, DEFAULT_REJECTION_MESSAGE);
        assert_eq!(messages.failure, DEFAULT_FAILURE_MESSAGE);
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_env_key_fills_missing_api_key() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides_from(env_of(&[(API_KEY_ENV, "sk-from-env")]))
            .unwrap();

        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-from-env"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_key_overrides_file_key() {
        let mut config = RelayConfig::from_toml_str("[upstream]\napi_key = \"sk-from-file\"").unwrap();
        config
            .apply_overrides_from(env_of(&[(API_KEY_ENV, "sk-from-env")]))
            .unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-from-env"));

        // 沒有環境變數時保留配置檔的 key
        let mut config = RelayConfig::from_toml_str("[upstream]\napi_key = \"sk-from-file\"").unwrap();
        config.apply_overrides_from(env_of(&[])).unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-from-file"));
    }

    #[test]
    fn test_unresolved_key_placeholder_uses_env_or_fails() {
        let toml_content = "[upstream]\napi_key = \"${RELAY_TEST_NEVER_SET_KEY}\"";

        let mut config = RelayConfig::from_toml_str(toml_content).unwrap();
        config
            .apply_overrides_from(env_of(&[(API_KEY_ENV, "sk-from-env")]))
            .unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-from-env"));
        assert!(config.validate().is_ok());

        let mut config = RelayConfig::from_toml_str(toml_content).unwrap();
        config.apply_overrides_from(env_of(&[])).unwrap();
        match config.validate() {
            Err(RelayError::MissingConfigError { field }) => assert_eq!(field, "upstream.api_key"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_port_env_overrides_server_port() {
        let mut config = RelayConfig::from_toml_str("[server]\nport = 7000").unwrap();
        config.apply_overrides_from(env_of(&[(PORT_ENV, "8081")])).unwrap();
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_invalid_port_env_is_rejected() {
        for bad in ["abc", "0", "70000"] {
            let mut config = RelayConfig::default();
            match config.apply_overrides_from(env_of(&[(PORT_ENV, bad)])) {
                Err(RelayError::InvalidConfigValueError { field, value, .. }) => {
                    assert_eq!(field, "PORT");
                    assert_eq!(value, bad);
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    /// 唯一讀取真實 OPENROUTER_API_KEY / PORT 的測試
    #[test]
    fn test_load_applies_process_environment() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nport = 7000\n\n[upstream]\napi_key = \"sk-from-file\"\n")
            .unwrap();

        std::env::set_var(API_KEY_ENV, "sk-from-process-env");
        std::env::set_var(PORT_ENV, "8082");
        let loaded = RelayConfig::load(Some(temp_file.path()));
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(PORT_ENV);

        let config = loaded.unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-from-process-env"));
        assert_eq!(config.server.port, 8082);
    }
}
