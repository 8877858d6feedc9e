mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::{debug, warn};

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    let mut config = parse(&config_str)?;
    apply_env_overrides(&mut config);

    Ok(config)
}

pub fn parse(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.llm.model.trim().is_empty() {
        return Err(crate::Error::config("llm.model must not be empty"));
    }
    if config.llm.max_tokens == 0 {
        return Err(crate::Error::config("llm.max_tokens must be greater than zero"));
    }
    if config.server.max_body_bytes == 0 {
        return Err(crate::Error::config(
            "server.max_body_bytes must be greater than zero",
        ));
    }
    Ok(())
}

fn apply_env_overrides(config: &mut Config) {
    if config.llm.api_key.is_empty() {
        match env::var("OPENAI_API_KEY") {
            Ok(key) => config.llm.api_key = key,
            Err(_) => warn!("No LLM API key configured; analysis requests will fail upstream"),
        }
    }

    if let Ok(path) = env::var("THEME_DB_PATH") {
        config.theme.database_path = path;
    }
}
