use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3001",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub capabilities: CapabilitiesConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub title_model: String,
    pub max_tokens: u32,
    pub title_max_tokens: u32,
    pub improve_max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct CapabilitiesConfig {
    /// Taxonomy text file. `None` means the built-in framework text.
    pub source_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ReviewConfig {
    pub fallback_title: String,
    pub enforce_known_capabilities: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
    pub capabilities_source_path: Option<PathBuf>,
    pub log_level: Option<String>,
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
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4".to_string(),
                title_model: "gpt-4".to_string(),
                max_tokens: 4000,
                title_max_tokens: 50,
                improve_max_tokens: 4000,
                temperature: 0.7,
                timeout_secs: 120,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8000,
                allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
                graceful_shutdown_secs: 15,
            },
            capabilities: CapabilitiesConfig::default(),
            review: ReviewConfig {
                fallback_title: "Case Review".to_string(),
                enforce_known_capabilities: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("gpfolio.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(title_model) = llm.title_model {
                self.llm.title_model = title_model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(title_max_tokens) = llm.title_max_tokens {
                self.llm.title_max_tokens = title_max_tokens;
            }
            if let Some(improve_max_tokens) = llm.improve_max_tokens {
                self.llm.improve_max_tokens = improve_max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(allowed_origins) = server.allowed_origins {
                self.server.allowed_origins = allowed_origins;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(capabilities) = patch.capabilities {
            if let Some(source_path) = capabilities.source_path {
                self.capabilities.source_path = Some(source_path);
            }
        }

        if let Some(review) = patch.review {
            if let Some(fallback_title) = review.fallback_title {
                self.review.fallback_title = fallback_title;
            }
            if let Some(enforce) = review.enforce_known_capabilities {
                self.review.enforce_known_capabilities = enforce;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // OPENAI_API_KEY is honoured as a fallback for existing deployments.
        let api_key = read_env("GPFOLIO_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("GPFOLIO_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_TITLE_MODEL") {
            self.llm.title_model = value;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("GPFOLIO_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_TITLE_MAX_TOKENS") {
            self.llm.title_max_tokens = parse_u32("GPFOLIO_LLM_TITLE_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_IMPROVE_MAX_TOKENS") {
            self.llm.improve_max_tokens = parse_u32("GPFOLIO_LLM_IMPROVE_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("GPFOLIO_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("GPFOLIO_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("GPFOLIO_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GPFOLIO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GPFOLIO_SERVER_PORT") {
            self.server.port = parse_u16("GPFOLIO_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("GPFOLIO_SERVER_ALLOWED_ORIGINS") {
            self.server.allowed_origins = split_list(&value);
        }
        if let Some(value) = read_env("GPFOLIO_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("GPFOLIO_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("GPFOLIO_CAPABILITIES_SOURCE_PATH") {
            self.capabilities.source_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("GPFOLIO_REVIEW_FALLBACK_TITLE") {
            self.review.fallback_title = value;
        }
        if let Some(value) = read_env("GPFOLIO_REVIEW_ENFORCE_KNOWN_CAPABILITIES") {
            self.review.enforce_known_capabilities =
                parse_bool("GPFOLIO_REVIEW_ENFORCE_KNOWN_CAPABILITIES", &value)?;
        }

        let log_level =
            read_env("GPFOLIO_LOGGING_LEVEL").or_else(|| read_env("GPFOLIO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GPFOLIO_LOGGING_FORMAT").or_else(|| read_env("GPFOLIO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(api_key);
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(source_path) = overrides.capabilities_source_path {
            self.capabilities.source_path = Some(source_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_review(&self.review)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The explicit path when it exists, otherwise the first of `gpfolio.toml`
/// and `config/gpfolio.toml` found in the working directory.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("gpfolio.toml"), PathBuf::from("config/gpfolio.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set GPFOLIO_LLM_API_KEY or OPENAI_API_KEY)".to_string(),
        ));
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() || llm.title_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.model and llm.title_model must not be empty".to_string(),
        ));
    }

    if llm.max_tokens == 0 || llm.title_max_tokens == 0 || llm.improve_max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens, llm.title_max_tokens and llm.improve_max_tokens must be greater than zero"
                .to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(origin) = server
        .allowed_origins
        .iter()
        .find(|origin| !origin.starts_with("http://") && !origin.starts_with("https://"))
    {
        return Err(ConfigError::Validation(format!(
            "server.allowed_origins entry `{origin}` must start with http:// or https://"
        )));
    }

    Ok(())
}

fn validate_review(review: &ReviewConfig) -> Result<(), ConfigError> {
    if review.fallback_title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "review.fallback_title must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    capabilities: Option<CapabilitiesPatch>,
    review: Option<ReviewPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    title_model: Option<String>,
    max_tokens: Option<u32>,
    title_max_tokens: Option<u32>,
    improve_max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CapabilitiesPatch {
    source_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ReviewPatch {
    fallback_title: Option<String>,
    enforce_known_capabilities: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const TOUCHED_VARS: [&str; 8] = [
        "GPFOLIO_LLM_API_KEY",
        "OPENAI_API_KEY",
        "GPFOLIO_LLM_MODEL",
        "GPFOLIO_LLM_TEMPERATURE",
        "GPFOLIO_LOG_LEVEL",
        "GPFOLIO_LOG_FORMAT",
        "GPFOLIO_SERVER_ALLOWED_ORIGINS",
        "TEST_GPFOLIO_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn missing_file() -> LoadOptions {
        LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/gpfolio.toml")),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("TEST_GPFOLIO_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("gpfolio.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_GPFOLIO_API_KEY}"
model = "gpt-4o"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.expose_secret() == "sk-from-env",
                "api key should be interpolated from environment",
            )?;
            ensure(config.llm.model == "gpt-4o", "model should be read from file")?;
            ensure(config.llm.title_model == "gpt-4", "title model should keep its default")?;
            Ok(())
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn openai_api_key_is_accepted_as_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("OPENAI_API_KEY", "sk-openai");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(missing_file())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.llm.api_key.expose_secret() == "sk-openai",
                "OPENAI_API_KEY should populate llm.api_key",
            )
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("GPFOLIO_LLM_API_KEY", "sk-test");
        env::set_var("GPFOLIO_LOG_LEVEL", "warn");
        env::set_var("GPFOLIO_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(missing_file())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("GPFOLIO_LLM_MODEL", "model-from-env");
        env::set_var("GPFOLIO_LLM_API_KEY", "sk-from-env");
        env::set_var("GPFOLIO_SERVER_ALLOWED_ORIGINS", "https://a.example, https://b.example");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("gpfolio.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "sk-from-file"
model = "model-from-file"
temperature = 0.2

[server]
port = 9100

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    llm_model: Some("model-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.model == "model-from-override", "override model should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.llm.api_key.expose_secret() == "sk-from-env",
                "env api key should win over file and defaults",
            )?;
            ensure((config.llm.temperature - 0.2).abs() < f32::EPSILON, "file temperature")?;
            ensure(config.server.port == 9100, "file port should override default")?;
            ensure(
                config.server.allowed_origins
                    == vec!["https://a.example".to_string(), "https://b.example".to_string()],
                "env origins should be split on commas",
            )?;
            Ok(())
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_without_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(missing_file()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn invalid_temperature_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("GPFOLIO_LLM_API_KEY", "sk-test");
        env::set_var("GPFOLIO_LLM_TEMPERATURE", "warm");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(missing_file()) {
                Ok(_) => return Err("expected invalid override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "GPFOLIO_LLM_TEMPERATURE"
                ),
                "invalid temperature should name the env var",
            )
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }

    #[test]
    fn require_file_reports_missing_path() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        let result = AppConfig::load(LoadOptions { require_file: true, ..missing_file() });
        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail with MissingConfigFile",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOUCHED_VARS);

        env::set_var("GPFOLIO_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(missing_file())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.server.allowed_origins.len() == 4, "default origins are localhost dev")?;
            Ok(())
        })();

        clear_vars(&TOUCHED_VARS);
        result
    }
}
