use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_endpoint(config)?;
    validate_chat(config)?;
    validate_identity(config)?;
    validate_log_level(config)?;
    validate_log_format(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_endpoint(config: &AppConfig) -> Result<(), ConfigError> {
    let endpoint = &config.endpoint;
    if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
        return Err(validation_err(
            "endpoint.url must start with http:// or https://",
        ));
    }
    if let Err(err) = url::Url::parse(&endpoint.url) {
        return Err(validation_err(format!("endpoint.url is invalid: {err}")));
    }
    if endpoint.api_key.trim().is_empty() {
        return Err(validation_err("endpoint.api_key cannot be empty"));
    }
    if endpoint.timeout == 0 {
        return Err(validation_err("endpoint.timeout must be greater than 0"));
    }
    if endpoint.connect_timeout == 0 {
        return Err(validation_err(
            "endpoint.connect_timeout must be greater than 0",
        ));
    }
    if endpoint.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "endpoint.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    validate_proxy_url(endpoint.proxy.as_deref())
}

fn validate_proxy_url(proxy_url: Option<&str>) -> Result<(), ConfigError> {
    let Some(proxy_url) = proxy_url else {
        return Ok(());
    };
    if proxy_url.trim().is_empty() {
        return Err(validation_err("endpoint.proxy cannot be empty when set"));
    }

    let parsed = url::Url::parse(proxy_url)
        .map_err(|err| validation_err(format!("endpoint.proxy is invalid: {err}")))?;
    match parsed.scheme() {
        "http" | "https" | "socks5" | "socks5h" => Ok(()),
        other => Err(validation_err(format!(
            "endpoint.proxy has unsupported scheme '{other}'"
        ))),
    }
}

fn validate_chat(config: &AppConfig) -> Result<(), ConfigError> {
    if config.chat.max_frame_retries == 0 {
        return Err(validation_err(
            "chat.max_frame_retries must be greater than 0",
        ));
    }
    if config.chat.stream_idle_timeout_secs == Some(0) {
        return Err(validation_err(
            "chat.stream_idle_timeout_secs must be greater than 0 when set",
        ));
    }
    Ok(())
}

fn validate_identity(config: &AppConfig) -> Result<(), ConfigError> {
    if config.identity.user_id.trim().is_empty() {
        return Err(validation_err("identity.user_id cannot be empty"));
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), ConfigError> {
    match config.features.log_format.to_lowercase().as_str() {
        "text" | "json" => Ok(()),
        _ => Err(validation_err(format!(
            "Invalid log_format '{}'. Must be one of: text, json",
            config.features.log_format
        ))),
    }
}
