use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use finda_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = if config.extractor.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let entries: Vec<(&str, String, Option<&str>)> = vec![
        ("database.url", config.database.url.clone(), Some("FINDA_DATABASE_URL")),
        ("database.max_connections", config.database.max_connections.to_string(), None),
        ("database.timeout_secs", config.database.timeout_secs.to_string(), None),
        ("extractor.mode", format!("{:?}", config.extractor.mode), Some("FINDA_EXTRACTOR_MODE")),
        ("extractor.model", config.extractor.model.clone(), None),
        ("extractor.api_key", api_key.to_string(), Some("FINDA_EXTRACTOR_API_KEY")),
        ("extractor.timeout_secs", config.extractor.timeout_secs.to_string(), None),
        ("policy.max_turns", config.policy.max_turns.to_string(), None),
        (
            "policy.presentation_threshold",
            config.policy.presentation_threshold.to_string(),
            None,
        ),
        ("policy.top_k", config.policy.top_k.to_string(), None),
        ("policy.turn_timeout_secs", config.policy.turn_timeout_secs.to_string(), None),
        ("policy.completed_ttl_secs", config.policy.completed_ttl_secs.to_string(), None),
        ("logging.level", config.logging.level.clone(), Some("FINDA_LOG_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), None),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key} = {value} (source: {source})"));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("FINDA_CONFIG") {
        let path = PathBuf::from(path);
        return path.exists().then_some(path);
    }
    let default = PathBuf::from("finda.toml");
    default.exists().then_some(default)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
