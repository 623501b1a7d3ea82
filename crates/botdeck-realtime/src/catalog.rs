//! The fixed catalog of server-pushed event types.
//!
//! The server only ever tags frames with one of these names; anything
//! else is dropped at the wire boundary. Payload shapes are owned by the
//! consuming subsystems and are opaque to this crate.

use std::fmt;

/// A recognized server-pushed event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Live market metrics for a project (price, volume, holders).
    ProjectMetricsUpdated,
    /// Aggregate performance of a project's trading bots.
    BotPerformanceUpdated,
    /// A new entry in a project's activity log.
    ActivityLogAdded,
    /// New points for a project's time-series charts.
    TimeseriesUpdated,
    /// Progress of a volume-generation run.
    VolumeGenerationUpdated,
    /// Progress of a holder-generation run.
    HolderGenerationUpdated,
}

impl EventKind {
    /// Every recognized event type, in catalog order.
    pub const ALL: [EventKind; 6] = [
        EventKind::ProjectMetricsUpdated,
        EventKind::BotPerformanceUpdated,
        EventKind::ActivityLogAdded,
        EventKind::TimeseriesUpdated,
        EventKind::VolumeGenerationUpdated,
        EventKind::HolderGenerationUpdated,
    ];

    /// The wire name of this event type.
    pub fn as_name(self) -> &'static str {
        match self {
            EventKind::ProjectMetricsUpdated => "project:metrics:updated",
            EventKind::BotPerformanceUpdated => "bot:performance:updated",
            EventKind::ActivityLogAdded => "activity:log:added",
            EventKind::TimeseriesUpdated => "timeseries:updated",
            EventKind::VolumeGenerationUpdated => "volume:generation:updated",
            EventKind::HolderGenerationUpdated => "holder:generation:updated",
        }
    }

    /// Look up an event type by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "project:metrics:updated" => Some(EventKind::ProjectMetricsUpdated),
            "bot:performance:updated" => Some(EventKind::BotPerformanceUpdated),
            "activity:log:added" => Some(EventKind::ActivityLogAdded),
            "timeseries:updated" => Some(EventKind::TimeseriesUpdated),
            "volume:generation:updated" => Some(EventKind::VolumeGenerationUpdated),
            "holder:generation:updated" => Some(EventKind::HolderGenerationUpdated),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}
