use std::sync::Arc;

use gpfolio_agent::{LlmClient, LlmError, OpenAiClient, ReviewRuntime};
use gpfolio_core::config::{AppConfig, ConfigError};
use gpfolio_core::{load_taxonomy, ApplicationError, TaxonomyError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<ReviewRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    #[error("generation client setup failed: {0}")]
    Client(#[source] LlmError),
    #[error("review runtime setup failed: {0}")]
    Runtime(#[source] ApplicationError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let client = OpenAiClient::from_config(&config.llm).map_err(BootstrapError::Client)?;
    info!(
        event_name = "system.bootstrap.client_ready",
        correlation_id = "bootstrap",
        endpoint = client.endpoint(),
        model = %config.llm.model,
        "generation client configured"
    );
    bootstrap_with_client(config, Arc::new(client))
}

/// Wires the runtime around an already-built client. Config is used as
/// given and is expected to be validated already.
pub fn bootstrap_with_client(
    config: AppConfig,
    client: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let taxonomy = load_taxonomy(config.capabilities.source_path.as_deref())?;
    info!(
        event_name = "system.bootstrap.taxonomy_loaded",
        correlation_id = "bootstrap",
        groups = taxonomy.len(),
        source = config
            .capabilities
            .source_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        "capability taxonomy loaded"
    );

    let runtime = ReviewRuntime::new(&config, Arc::new(taxonomy), client)
        .map_err(BootstrapError::Runtime)?;

    Ok(Application { config, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use gpfolio_agent::ScriptedLlmClient;
    use gpfolio_core::config::AppConfig;
    use secrecy::SecretString;

    use crate::bootstrap::{bootstrap_with_client, bootstrap_with_config, BootstrapError};

    fn scripted() -> Arc<ScriptedLlmClient> {
        Arc::new(ScriptedLlmClient::with_replies("Brief Description: x", "Title"))
    }

    #[tokio::test]
    async fn bootstrap_with_config_builds_http_client_and_runtime() {
        let mut config = AppConfig::default();
        config.llm.api_key = SecretString::from("sk-test".to_string());
        config.llm.base_url = "http://127.0.0.1:9/v1".to_string();

        let app = bootstrap_with_config(config).await.expect("bootstrap");
        assert_eq!(app.runtime.fallback_title(), "Case Review");
        assert!(!app.runtime.capabilities().is_empty());
    }

    #[test]
    fn bootstrap_loads_built_in_taxonomy_by_default() {
        let app = bootstrap_with_client(AppConfig::default(), scripted()).expect("bootstrap");
        assert_eq!(app.runtime.capabilities().len(), 13);
    }

    #[test]
    fn bootstrap_rejects_empty_taxonomy_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Header without descriptors").expect("write");

        let mut config = AppConfig::default();
        config.capabilities.source_path = Some(file.path().to_path_buf());

        let result = bootstrap_with_client(config, scripted());
        assert!(matches!(result, Err(BootstrapError::Taxonomy(_))));
    }
}
