use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PolicyConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub extractor: ExtractorConfig,
    pub policy: PolicySettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PolicySettings {
    pub max_turns: u32,
    pub presentation_threshold: u64,
    pub top_k: usize,
    pub turn_timeout_secs: u64,
    pub completed_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorMode {
    RuleBased,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub extractor_mode: Option<ExtractorMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://finda.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            extractor: ExtractorConfig {
                mode: ExtractorMode::RuleBased,
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                timeout_secs: 10,
            },
            policy: PolicySettings {
                max_turns: 5,
                presentation_threshold: 5,
                top_k: 5,
                turn_timeout_secs: 25,
                completed_ttl_secs: 60,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl PolicySettings {
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            max_turns: self.max_turns,
            presentation_threshold: self.presentation_threshold,
            top_k: self.top_k,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<RawDatabase>,
    extractor: Option<RawExtractor>,
    policy: Option<RawPolicy>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtractor {
    mode: Option<ExtractorMode>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPolicy {
    max_turns: Option<u32>,
    presentation_threshold: Option<u64>,
    top_k: Option<usize>,
    turn_timeout_secs: Option<u64>,
    completed_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .clone()
            .or_else(|| env::var("FINDA_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("finda.toml"));

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let interpolated = interpolate_env(&contents)?;
                let raw: RawConfig = toml::from_str(&interpolated)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_raw(raw);
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        }

        config.apply_env_overrides()?;
        config.apply_overrides(&options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_raw(&mut self, raw: RawConfig) {
        if let Some(database) = raw.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(extractor) = raw.extractor {
            if let Some(mode) = extractor.mode {
                self.extractor.mode = mode;
            }
            if let Some(model) = extractor.model {
                self.extractor.model = model;
            }
            if let Some(api_key) = extractor.api_key {
                self.extractor.api_key = Some(SecretString::from(api_key));
            }
            if let Some(timeout_secs) = extractor.timeout_secs {
                self.extractor.timeout_secs = timeout_secs;
            }
        }
        if let Some(policy) = raw.policy {
            if let Some(max_turns) = policy.max_turns {
                self.policy.max_turns = max_turns;
            }
            if let Some(presentation_threshold) = policy.presentation_threshold {
                self.policy.presentation_threshold = presentation_threshold;
            }
            if let Some(top_k) = policy.top_k {
                self.policy.top_k = top_k;
            }
            if let Some(turn_timeout_secs) = policy.turn_timeout_secs {
                self.policy.turn_timeout_secs = turn_timeout_secs;
            }
            if let Some(completed_ttl_secs) = policy.completed_ttl_secs {
                self.policy.completed_ttl_secs = completed_ttl_secs;
            }
        }
        if let Some(logging) = raw.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("FINDA_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = env::var("FINDA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(mode) = env::var("FINDA_EXTRACTOR_MODE") {
            self.extractor.mode = match mode.as_str() {
                "rule_based" => ExtractorMode::RuleBased,
                "llm" => ExtractorMode::Llm,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "FINDA_EXTRACTOR_MODE".to_string(),
                        value: mode,
                    });
                }
            };
        }
        if let Ok(api_key) = env::var("FINDA_EXTRACTOR_API_KEY") {
            self.extractor.api_key = Some(SecretString::from(api_key));
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.database_url {
            self.database.url = url.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(mode) = overrides.extractor_mode {
            self.extractor.mode = mode;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.policy.max_turns == 0 {
            return Err(ConfigError::Validation("policy.max_turns must be at least 1".to_string()));
        }
        if self.policy.top_k == 0 {
            return Err(ConfigError::Validation("policy.top_k must be at least 1".to_string()));
        }
        if self.policy.turn_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "policy.turn_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.extractor.mode == ExtractorMode::Llm && self.extractor.api_key.is_none() {
            return Err(ConfigError::Validation(
                "extractor.api_key is required when extractor.mode is llm".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replaces `${VAR}` expressions with the environment variable's value.
fn interpolate_env(contents: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(contents.len());
    let mut rest = contents;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::UnterminatedInterpolation);
        };
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}
