use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_MAX_RPM: u32 = 10;
const DEFAULT_DOCUMENT_CHAR_BUDGET: usize = 100_000;
const DEFAULT_UPLOAD_DIR: &str = "data";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_LOG_FILE: &str = "logs/findoc-analyzer.log";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the analyzer service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key sent as a bearer token to the OpenAI-compatible backend.
    pub openai_api_key: String,
    /// Chat model used for every analysis call.
    pub openai_model_name: String,
    /// Base URL of the OpenAI-compatible API (without the `/chat/completions` suffix).
    pub openai_base_url: String,
    /// Sampling temperature forwarded to the backend.
    pub llm_temperature: f32,
    /// Upper bound for a single backend call, in seconds.
    pub llm_timeout_secs: u64,
    /// Maximum number of backend calls allowed in flight at once.
    pub llm_max_concurrency: usize,
    /// Requests-per-minute ceiling applied across all backend calls.
    pub llm_max_rpm: u32,
    /// Prompt strategy used by the analyzer.
    pub analysis_mode: AnalysisMode,
    /// Maximum number of document characters placed in a prompt.
    pub document_char_budget: usize,
    /// Directory receiving per-request temporary PDF files.
    pub upload_dir: PathBuf,
    /// Largest accepted request body for `POST /analyze`.
    pub max_upload_bytes: usize,
    /// File receiving a copy of every log event.
    pub log_file: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// How the analyzer talks to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// One prompt, one completion.
    #[default]
    Single,
    /// Verifier, analyst, advisor, and risk assessor run as a sequential chain.
    Crew,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_base_url = load_env_optional("OPENAI_BASE_URL")
            .or_else(|| load_env_optional("OPENAI_API_BASE"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let config = Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_model_name: load_env_optional("OPENAI_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            openai_base_url,
            llm_temperature: parse_env_or("LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            llm_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            llm_max_concurrency: parse_env_or("LLM_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
            llm_max_rpm: parse_env_or("LLM_MAX_RPM", DEFAULT_MAX_RPM)?,
            analysis_mode: load_env_optional("ANALYSIS_MODE")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("ANALYSIS_MODE".into()))
                })
                .transpose()?
                .unwrap_or_default(),
            document_char_budget: parse_env_or(
                "DOCUMENT_CHAR_BUDGET",
                DEFAULT_DOCUMENT_CHAR_BUDGET,
            )?,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            log_file: load_env_optional("FINDOC_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        if self.llm_max_concurrency == 0 {
            return Err(ConfigError::InvalidValue("LLM_MAX_CONCURRENCY".into()));
        }
        if self.llm_max_rpm == 0 {
            return Err(ConfigError::InvalidValue("LLM_MAX_RPM".into()));
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("LLM_TIMEOUT_SECS".into()));
        }
        if self.document_char_budget == 0 {
            return Err(ConfigError::InvalidValue("DOCUMENT_CHAR_BUDGET".into()));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue("LLM_TEMPERATURE".into()));
        }
        Ok(())
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for AnalysisMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "crew" => Ok(Self::Crew),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        base_url = %config.openai_base_url,
        model = %config.openai_model_name,
        mode = ?config.analysis_mode,
        upload_dir = %config.upload_dir.display(),
        log_file = %config.log_file.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
