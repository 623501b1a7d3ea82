//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Botdeck Configuration
# Only override what you want to change -- missing fields use defaults.

[realtime]
endpoint_url = "wss://api.botdeck.io/realtime"
# max_reconnect_attempts = 5
# reconnect_base_delay_ms = 1000
# reconnect_max_delay_ms = 5000
# connect_timeout_ms = 20000

[startup]
# connect_delay_ms = 2000
# visibility_debounce_ms = 1500

[logging]
# directive = "botdeck=info"
"##
    .to_string()
}
