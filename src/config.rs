use anyhow::{Context, Result, anyhow};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::llm_providers::{LLMProviderFactory, LLMProviderType};
use crate::llm_service::{CountLimits, LLMService};
use crate::model_client::{FallbackPolicy, ModelClient};
use crate::prompt_builder::ResponseMode;

// Import logging macros
use crate::{log_system_event, log_validation};

const DEFAULT_MODELS: &str = "openai-fast,openai,mistral";

/// Free-tier key the default chat-completions endpoint requires as a bearer token
const DEFAULT_ENDPOINT_KEY: &str = "pollinations";
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub generation: GenerationConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Model endpoint and fallback chain configuration
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub provider: LLMProviderType,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub timeout_secs: u64,
    pub rate_limit_backoff_secs: u64,
    pub retry_delay_secs: u64,
    pub min_response_chars: usize,
    pub response_mode: ResponseMode,
    pub json_retries: usize,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub min_count: usize,
    pub max_count: usize,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

/// Reads a variable by name; `env::var` in production, a map in tests
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn read_or(lookup: Lookup, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(lookup: Lookup, key: &str, default: T) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_flag(lookup: Lookup, key: &str) -> bool {
    read_or(lookup, key, "true").parse::<bool>().unwrap_or(true)
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Self::from_source(&|key| env::var(key).ok())?;

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    pub fn from_source(lookup: Lookup) -> Result<Self> {
        Ok(Config {
            llm: LLMConfig::from_source(lookup)?,
            generation: GenerationConfig::from_source(lookup)?,
            session: SessionConfig::from_source(lookup)?,
            server: ServerConfig::from_source(lookup)?,
            logging: LoggingConfig::from_source(lookup),
        })
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            llm_provider = ?self.llm.provider,
            llm_base_url = ?self.llm.base_url,
            llm_api_key_masked = %self.llm.api_key.as_deref().map(mask_sensitive_data).unwrap_or_else(|| "<unset>".to_string()),
            llm_models = %self.llm.models.join(","),
            response_mode = ?self.llm.response_mode,
            session_ttl_minutes = self.session.ttl_minutes,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let llm = &self.llm;
        if llm.models.is_empty() {
            return Err(anyhow!("LLM_MODELS must name at least one model"));
        }
        if !(30..=90).contains(&llm.timeout_secs) {
            return Err(anyhow!("LLM_TIMEOUT_SECS must be between 30 and 90, got {}", llm.timeout_secs));
        }
        if !(5..=10).contains(&llm.rate_limit_backoff_secs) {
            return Err(anyhow!(
                "LLM_RATE_LIMIT_BACKOFF_SECS must be between 5 and 10, got {}",
                llm.rate_limit_backoff_secs
            ));
        }
        if !(2..=3).contains(&llm.retry_delay_secs) {
            return Err(anyhow!("LLM_RETRY_DELAY_SECS must be between 2 and 3, got {}", llm.retry_delay_secs));
        }

        let generation = &self.generation;
        if generation.min_count == 0 || generation.min_count > generation.max_count {
            return Err(anyhow!(
                "GENERATION_MIN_COUNT ({}) must be at least 1 and not exceed GENERATION_MAX_COUNT ({})",
                generation.min_count,
                generation.max_count
            ));
        }

        if self.session.ttl_minutes <= 0 {
            return Err(anyhow!("SESSION_TTL_MINUTES must be greater than 0"));
        }

        // Validate server port range
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if llm.api_key.is_none() {
            warn!("LLM_API_KEY is not set - requests will be sent without an Authorization header");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            inter_attempt_delay: Duration::from_secs(self.llm.retry_delay_secs),
            rate_limit_backoff: Duration::from_secs(self.llm.rate_limit_backoff_secs),
            min_response_chars: self.llm.min_response_chars,
        }
    }

    pub fn count_limits(&self) -> CountLimits {
        CountLimits {
            min: self.generation.min_count,
            max: self.generation.max_count,
        }
    }

    /// Wire the configured transport, fallback chain and parser mode into a service
    pub fn build_llm_service(&self) -> Result<LLMService> {
        let provider = LLMProviderFactory::create_provider(
            self.llm.provider,
            self.llm.api_key.clone(),
            self.llm.base_url.clone(),
            Duration::from_secs(self.llm.timeout_secs),
            self.llm.max_tokens,
        )
        .context("Failed to create LLM provider")?;

        let client = ModelClient::new(Arc::new(provider), self.llm.models.clone(), self.fallback_policy());
        Ok(LLMService::new(
            client,
            self.llm.response_mode,
            self.llm.json_retries,
            self.count_limits(),
        ))
    }
}

impl LLMConfig {
    fn from_source(lookup: Lookup) -> Result<Self> {
        let provider_str = read_or(lookup, "LLM_PROVIDER", "openai");
        let provider = LLMProviderType::parse(&provider_str).unwrap_or_else(|| {
            info!("Unknown LLM provider '{}', defaulting to OpenAI", provider_str);
            LLMProviderType::OpenAI
        });

        let models = read_or(lookup, "LLM_MODELS", DEFAULT_MODELS)
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();

        let response_mode = match read_or(lookup, "LLM_RESPONSE_MODE", "text").trim().to_lowercase().as_str() {
            "json" => ResponseMode::Json,
            "text" => ResponseMode::Text,
            other => return Err(anyhow!("Invalid LLM_RESPONSE_MODE value: '{}'. Use 'text' or 'json'", other)),
        };

        let max_tokens = match lookup("LLM_MAX_TOKENS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow!("Invalid LLM_MAX_TOKENS value: '{}'", raw))?,
            ),
            None => Some(DEFAULT_MAX_TOKENS),
        };

        let base_url = lookup("LLM_BASE_URL").filter(|u| !u.trim().is_empty());
        let api_key = lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()).or_else(|| {
            (provider == LLMProviderType::OpenAI && base_url.is_none()).then(|| DEFAULT_ENDPOINT_KEY.to_string())
        });

        Ok(LLMConfig {
            provider,
            base_url,
            api_key,
            models,
            timeout_secs: parse_or(lookup, "LLM_TIMEOUT_SECS", 60)?,
            rate_limit_backoff_secs: parse_or(lookup, "LLM_RATE_LIMIT_BACKOFF_SECS", 5)?,
            retry_delay_secs: parse_or(lookup, "LLM_RETRY_DELAY_SECS", 2)?,
            min_response_chars: parse_or(lookup, "LLM_MIN_RESPONSE_CHARS", 50)?,
            response_mode,
            json_retries: parse_or(lookup, "LLM_JSON_RETRIES", 2)?,
            max_tokens,
        })
    }
}

impl GenerationConfig {
    fn from_source(lookup: Lookup) -> Result<Self> {
        Ok(GenerationConfig {
            min_count: parse_or(lookup, "GENERATION_MIN_COUNT", 3)?,
            max_count: parse_or(lookup, "GENERATION_MAX_COUNT", 20)?,
        })
    }
}

impl SessionConfig {
    fn from_source(lookup: Lookup) -> Result<Self> {
        Ok(SessionConfig {
            ttl_minutes: parse_or(lookup, "SESSION_TTL_MINUTES", 120)?,
        })
    }
}

impl ServerConfig {
    fn from_source(lookup: Lookup) -> Result<Self> {
        let port_str = read_or(lookup, "PORT", "3000");
        let port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        Ok(ServerConfig {
            port,
            host: read_or(lookup, "HOST", "0.0.0.0"),
        })
    }
}

impl LoggingConfig {
    fn from_source(lookup: Lookup) -> Self {
        LoggingConfig {
            level: read_or(lookup, "RUST_LOG", "info,study_aid=debug"),
            file_enabled: parse_flag(lookup, "LOG_FILE_ENABLED"),
            console_enabled: parse_flag(lookup, "LOG_CONSOLE_ENABLED"),
            log_directory: read_or(lookup, "LOG_DIRECTORY", "logs"),
        }
    }
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
