//! Configuration models for claimcheck.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The configuration is built once at startup and handed to the clients;
//! nothing reads it through global state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Top-level configuration for claimcheck.
///
/// Every section is optional in the TOML file; missing keys fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language-model endpoint used for planning and reasoning
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search provider
    #[serde(default)]
    pub search: SearchConfig,

    /// Agent behaviour
    #[serde(default)]
    pub agent: AgentConfig,
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (can also be set via the `api_key_env` variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Base URL for the API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model ID used for both planning and reasoning
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for decomposition planning
    #[serde(default = "default_planner_temperature")]
    pub planner_temperature: f64,

    /// Sampling temperature for verdict reasoning
    #[serde(default = "default_reasoner_temperature")]
    pub reasoner_temperature: f64,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts per completion (transport-level)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_planner_temperature() -> f64 {
    0.3
}

fn default_reasoner_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_llm_api_key_env(),
            base_url: default_llm_base_url(),
            model: default_model(),
            planner_temperature: default_planner_temperature(),
            reasoner_temperature: default_reasoner_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// SERP provider reached through an authenticated HTTP proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint queried with `?q=`
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Route requests through the SERP proxy
    #[serde(default = "default_true")]
    pub use_proxy: bool,

    /// Proxy host
    #[serde(default = "default_proxy_host")]
    pub proxy_host: String,

    /// Proxy port
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,

    /// Proxy customer identity (falls back to BRIGHTDATA_CUSTOMER_ID)
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Proxy zone (falls back to BRIGHTDATA_ZONE)
    #[serde(default)]
    pub zone: Option<String>,

    /// Proxy password (falls back to BRIGHTDATA_PASSWORD)
    #[serde(default)]
    pub password: Option<String>,

    /// Accept the proxy's re-signed TLS certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Interface language (`hl`)
    #[serde(default = "default_language")]
    pub language: String,

    /// Result country (`gl`)
    #[serde(default)]
    pub country: Option<String>,

    /// Requested number of organic results (`num`)
    #[serde(default)]
    pub num_results: Option<u32>,
}

fn default_search_base_url() -> String {
    "https://www.google.com/search".to_string()
}

fn default_true() -> bool {
    true
}

fn default_proxy_host() -> String {
    "brd.superproxy.io".to_string()
}

fn default_proxy_port() -> u16 {
    33335
}

fn default_search_timeout() -> u64 {
    30
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            use_proxy: default_true(),
            proxy_host: default_proxy_host(),
            proxy_port: default_proxy_port(),
            customer_id: None,
            zone: None,
            password: None,
            accept_invalid_certs: false,
            timeout_secs: default_search_timeout(),
            language: default_language(),
            country: None,
            num_results: None,
        }
    }
}

/// Agent behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on sub-queries the planner may request
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,
}

fn default_max_sub_queries() -> usize {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_sub_queries: default_max_sub_queries(),
        }
    }
}

/// Resolved proxy identity for the SERP provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub customer_id: String,
    pub zone: String,
    pub password: String,
}

impl ProxyCredentials {
    /// Proxy username in the provider's `brd-customer-<id>-zone-<zone>` form.
    pub fn username(&self) -> String {
        format!("brd-customer-{}-zone-{}", self.customer_id, self.zone)
    }
}

pub const CUSTOMER_ID_ENV: &str = "BRIGHTDATA_CUSTOMER_ID";
pub const ZONE_ENV: &str = "BRIGHTDATA_ZONE";
pub const PASSWORD_ENV: &str = "BRIGHTDATA_PASSWORD";

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue("llm.model must not be empty".into()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue("llm.base_url must not be empty".into()));
        }
        if self.search.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "search.base_url must not be empty".into(),
            ));
        }
        if self.llm.timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeouts must be at least one second".into(),
            ));
        }
        if self.llm.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "llm.max_retries must be at least 1".into(),
            ));
        }
        if self.agent.max_sub_queries < 2 {
            return Err(ConfigError::InvalidValue(
                "agent.max_sub_queries must be at least 2".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the LLM API key from config or environment.
    ///
    /// Absence is not an error here: the planner skips decomposition without a key,
    /// while the reasoner refuses to run.
    pub fn resolve_llm_api_key(&self) -> Option<String> {
        if let Some(key) = &self.llm.api_key {
            let key = expand_env_vars(key);
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Resolve the SERP proxy identity from config or environment.
    ///
    /// Returns `None` if any of the three parts is missing.
    pub fn resolve_proxy_credentials(&self) -> Option<ProxyCredentials> {
        let resolve = |explicit: &Option<String>, env_var: &str| -> Option<String> {
            explicit
                .as_deref()
                .map(expand_env_vars)
                .or_else(|| std::env::var(env_var).ok())
                .filter(|v| !v.trim().is_empty())
        };

        Some(ProxyCredentials {
            customer_id: resolve(&self.search.customer_id, CUSTOMER_ID_ENV)?,
            zone: resolve(&self.search.zone, ZONE_ENV)?,
            password: resolve(&self.search.password, PASSWORD_ENV)?,
        })
    }
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}
