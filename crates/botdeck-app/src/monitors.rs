//! Logging subscribers for the realtime event feed.
//!
//! Payload shapes are owned by the server; the realtime client treats
//! them as opaque JSON. These structs mirror the dashboard feed and are
//! parsed leniently so a server-side field addition never breaks the log.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use botdeck_realtime::{EventKind, RealtimeClient};

// ---------------------------------------------------------------------------
// Feed payloads
// ---------------------------------------------------------------------------

/// Payload of `project:metrics:updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMetricsPayload {
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub holder_count: Option<u64>,
}

/// Payload of `bot:performance:updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotPerformancePayload {
    pub bot_id: String,
    #[serde(default)]
    pub trades_executed: Option<u64>,
    #[serde(default)]
    pub success_rate: Option<f64>,
}

/// Payload of `activity:log:added`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityLogPayload {
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// Attach a logging subscriber for every catalog event.
pub async fn attach(client: &RealtimeClient) {
    client
        .subscribe(
            EventKind::ProjectMetricsUpdated,
            Arc::new(|payload| {
                match serde_json::from_value::<ProjectMetricsPayload>(payload.clone()) {
                    Ok(m) => info!(
                        price_usd = m.price_usd,
                        volume_24h = m.volume_24h,
                        holders = m.holder_count,
                        "project metrics updated"
                    ),
                    Err(e) => debug!(error = %e, "unparsed metrics payload"),
                }
            }),
        )
        .await;

    client
        .subscribe(
            EventKind::BotPerformanceUpdated,
            Arc::new(|payload| {
                match serde_json::from_value::<BotPerformancePayload>(payload.clone()) {
                    Ok(p) => info!(
                        bot = %p.bot_id,
                        trades = p.trades_executed,
                        success_rate = p.success_rate,
                        "bot performance updated"
                    ),
                    Err(e) => debug!(error = %e, "unparsed bot performance payload"),
                }
            }),
        )
        .await;

    client
        .subscribe(
            EventKind::ActivityLogAdded,
            Arc::new(|payload| {
                match serde_json::from_value::<ActivityLogPayload>(payload.clone()) {
                    Ok(entry) => info!(
                        level = entry.level.as_deref().unwrap_or("info"),
                        "activity: {}",
                        entry.message
                    ),
                    Err(e) => debug!(error = %e, "unparsed activity log payload"),
                }
            }),
        )
        .await;

    client
        .subscribe(
            EventKind::TimeseriesUpdated,
            Arc::new(|payload| {
                let points = payload.as_array().map_or(0, Vec::len);
                debug!(points, "timeseries updated");
            }),
        )
        .await;

    client
        .subscribe(
            EventKind::VolumeGenerationUpdated,
            Arc::new(|payload| {
                info!(progress = %payload, "volume generation updated");
            }),
        )
        .await;

    client
        .subscribe(
            EventKind::HolderGenerationUpdated,
            Arc::new(|payload| {
                info!(progress = %payload, "holder generation updated");
            }),
        )
        .await;
}
