use std::env;
use std::fs;
use std::path::Path;

use gpfolio_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::CommandResult;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source =
            field_source(field.key, field.env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm = &config.llm;
    let server = &config.server;
    vec![
        Field {
            key: "llm.api_key",
            value: redact_token(llm.api_key.expose_secret()),
            env_keys: &["GPFOLIO_LLM_API_KEY", "OPENAI_API_KEY"],
        },
        Field { key: "llm.base_url", value: llm.base_url.clone(), env_keys: &["GPFOLIO_LLM_BASE_URL"] },
        Field { key: "llm.model", value: llm.model.clone(), env_keys: &["GPFOLIO_LLM_MODEL"] },
        Field {
            key: "llm.title_model",
            value: llm.title_model.clone(),
            env_keys: &["GPFOLIO_LLM_TITLE_MODEL"],
        },
        Field {
            key: "llm.max_tokens",
            value: llm.max_tokens.to_string(),
            env_keys: &["GPFOLIO_LLM_MAX_TOKENS"],
        },
        Field {
            key: "llm.title_max_tokens",
            value: llm.title_max_tokens.to_string(),
            env_keys: &["GPFOLIO_LLM_TITLE_MAX_TOKENS"],
        },
        Field {
            key: "llm.improve_max_tokens",
            value: llm.improve_max_tokens.to_string(),
            env_keys: &["GPFOLIO_LLM_IMPROVE_MAX_TOKENS"],
        },
        Field {
            key: "llm.temperature",
            value: llm.temperature.to_string(),
            env_keys: &["GPFOLIO_LLM_TEMPERATURE"],
        },
        Field {
            key: "llm.timeout_secs",
            value: llm.timeout_secs.to_string(),
            env_keys: &["GPFOLIO_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "server.bind_address",
            value: server.bind_address.clone(),
            env_keys: &["GPFOLIO_SERVER_BIND_ADDRESS"],
        },
        Field { key: "server.port", value: server.port.to_string(), env_keys: &["GPFOLIO_SERVER_PORT"] },
        Field {
            key: "server.allowed_origins",
            value: server.allowed_origins.join(","),
            env_keys: &["GPFOLIO_SERVER_ALLOWED_ORIGINS"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: server.graceful_shutdown_secs.to_string(),
            env_keys: &["GPFOLIO_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "capabilities.source_path",
            value: config
                .capabilities
                .source_path
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<built-in>".to_string()),
            env_keys: &["GPFOLIO_CAPABILITIES_SOURCE_PATH"],
        },
        Field {
            key: "review.fallback_title",
            value: config.review.fallback_title.clone(),
            env_keys: &["GPFOLIO_REVIEW_FALLBACK_TITLE"],
        },
        Field {
            key: "review.enforce_known_capabilities",
            value: config.review.enforce_known_capabilities.to_string(),
            env_keys: &["GPFOLIO_REVIEW_ENFORCE_KNOWN_CAPABILITIES"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["GPFOLIO_LOGGING_LEVEL", "GPFOLIO_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["GPFOLIO_LOGGING_FORMAT", "GPFOLIO_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a `sk-` style prefix so operators can tell key families apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
