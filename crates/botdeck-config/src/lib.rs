//! Botdeck configuration system.
//!
//! Provides TOML-based configuration for the realtime client and the
//! application shell. All config sections use sensible defaults so
//! partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use botdeck_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.realtime.endpoint_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

// Re-export core types for convenience
pub use schema::BotdeckConfig;

use botdeck_common::ConfigError;

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, and validates the result. Validation problems are
/// logged as warnings; the parsed config is still returned.
pub fn load_config() -> Result<BotdeckConfig, ConfigError> {
    let config = toml_loader::load_default()?;

    if let Err(e) = validation::validate(&config) {
        tracing::warn!("config validation warning: {e}");
    }

    Ok(config)
}
