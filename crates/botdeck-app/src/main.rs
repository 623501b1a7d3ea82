mod cli;
mod monitors;
mod supervisor;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use botdeck_realtime::{RealtimeClient, RealtimeConfig};
use supervisor::ConnectionSupervisor;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root — two levels up from crates/botdeck-app/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();

    // Parse CLI arguments
    let args = cli::parse();

    // Load config before logging init so the directive can come from the
    // config file when the CLI does not override it.
    let config = match &args.config {
        Some(path) => botdeck_config::toml_loader::load_from_path(std::path::Path::new(path)),
        None => botdeck_config::load_config(),
    }
    .unwrap_or_else(|e| {
        eprintln!("failed to load config: {e}; using defaults");
        botdeck_config::BotdeckConfig::default()
    });

    // Initialize logging
    let log_directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.directive.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "botdeck=info".parse().unwrap()),
            ),
        )
        .init();

    let mut rt_config = RealtimeConfig {
        endpoint_url: config.realtime.endpoint_url.clone(),
        max_reconnect_attempts: config.realtime.max_reconnect_attempts,
        reconnect_base_delay_ms: config.realtime.reconnect_base_delay_ms,
        reconnect_max_delay_ms: config.realtime.reconnect_max_delay_ms,
        connect_timeout_ms: config.realtime.connect_timeout_ms,
    };
    // Endpoint precedence: CLI, then environment, then config file.
    if let Some(endpoint) = args
        .endpoint
        .clone()
        .or_else(|| std::env::var("BOTDECK_ENDPOINT").ok())
    {
        rt_config.endpoint_url = endpoint;
    }

    info!(url = %rt_config.endpoint_url, "starting botdeck");

    let client = Arc::new(RealtimeClient::new(rt_config));
    monitors::attach(&client).await;

    let supervisor = ConnectionSupervisor::new(Arc::clone(&client), &config.startup);
    supervisor.start();

    if let Some(project) = &args.project {
        client.join_project(project.as_str()).await;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    supervisor.shutdown().await;
}
