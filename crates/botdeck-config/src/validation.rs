//! Configuration validation.
//!
//! Validates numeric ranges for the realtime and startup sections,
//! collecting every problem into a single `ConfigError`.

use crate::schema::BotdeckConfig;
use botdeck_common::ConfigError;

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BotdeckConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if config.realtime.endpoint_url.is_empty() {
        errors.push("realtime.endpoint_url is empty".to_string());
    } else if !config.realtime.endpoint_url.starts_with("ws://")
        && !config.realtime.endpoint_url.starts_with("wss://")
    {
        errors.push(format!(
            "realtime.endpoint_url = {} is not a ws:// or wss:// URL",
            config.realtime.endpoint_url
        ));
    }

    validate_range(
        &mut errors,
        "realtime.max_reconnect_attempts",
        u64::from(config.realtime.max_reconnect_attempts),
        1,
        20,
    );
    validate_range(
        &mut errors,
        "realtime.reconnect_base_delay_ms",
        config.realtime.reconnect_base_delay_ms,
        100,
        60_000,
    );
    validate_range(
        &mut errors,
        "realtime.connect_timeout_ms",
        config.realtime.connect_timeout_ms,
        1000,
        120_000,
    );
    if config.realtime.reconnect_max_delay_ms < config.realtime.reconnect_base_delay_ms {
        errors.push(format!(
            "realtime.reconnect_max_delay_ms = {} is below reconnect_base_delay_ms = {}",
            config.realtime.reconnect_max_delay_ms, config.realtime.reconnect_base_delay_ms
        ));
    }

    validate_range(
        &mut errors,
        "startup.connect_delay_ms",
        config.startup.connect_delay_ms,
        0,
        60_000,
    );
    validate_range(
        &mut errors,
        "startup.visibility_debounce_ms",
        config.startup.visibility_debounce_ms,
        0,
        60_000,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
