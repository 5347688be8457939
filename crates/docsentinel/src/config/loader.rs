use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Applies `DOCSENTINEL_*` environment overrides on top of the file values.
///
/// Deployment environments tune endpoints and resilience knobs without
/// shipping a different config file.
fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("DOCSENTINEL_INBOX_DIRECTORY") {
        config.inbox_directory = v;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_DATABASE_PATH") {
        config.database_path = v;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_LLM_ENDPOINT") {
        config.llm.endpoint = v;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_LLM_MODEL") {
        config.llm.model = v;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_SEARCH_ENDPOINT") {
        config.search.endpoint = v;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_WORKER_COUNT") {
        config.worker_count = parse_env("DOCSENTINEL_WORKER_COUNT", &v)?;
    }
    if let Ok(v) = std::env::var("DOCSENTINEL_MAX_RETRIES") {
        config.retry.max_retries = parse_env("DOCSENTINEL_MAX_RETRIES", &v)?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvOverride {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config.retry.base_delay_ms == 0 {
        return Err(ConfigError::Validation {
            message: "retry.base_delay_ms must be non-zero".to_string(),
        });
    }

    if config.retry.max_delay_ms < config.retry.base_delay_ms {
        return Err(ConfigError::Validation {
            message: format!(
                "retry.max_delay_ms ({}) must not be below retry.base_delay_ms ({})",
                config.retry.max_delay_ms, config.retry.base_delay_ms
            ),
        });
    }

    for (name, breaker) in [
        ("llm", &config.breakers.llm),
        ("search", &config.breakers.search),
        ("store", &config.breakers.store),
    ] {
        if breaker.failure_threshold == 0 {
            return Err(ConfigError::Validation {
                message: format!("breakers.{}.failure_threshold must be at least 1", name),
            });
        }
    }

    if config.detection.search_query_chars == 0 {
        return Err(ConfigError::Validation {
            message: "detection.search_query_chars must be non-zero".to_string(),
        });
    }

    if config.detection.feedback_detail_chars == 0 {
        return Err(ConfigError::Validation {
            message: "detection.feedback_detail_chars must be non-zero".to_string(),
        });
    }

    Ok(())
}
