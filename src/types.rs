use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single telemetry event record buffered by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Event name, e.g. "player_level_up"
    pub name: String,
    /// Unix timestamp in milliseconds at which the event was recorded
    pub timestamp_ms: i64,
    pub title_id: String,
    pub player_id: String,
    pub session_id: String,
    /// Free-form event payload
    pub payload: Value,
}

/// Identity of the title/player/session producing events.
///
/// Injected explicitly into the factory that builds records; there is no
/// process-wide registration point.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub title_id: String,
    pub player_id: String,
    pub session_id: String,
}

/// Stamps event records with the owning context and the current time
pub struct EventFactory {
    context: EventContext,
}

impl EventFactory {
    pub fn new(context: EventContext) -> Self {
        Self { context }
    }

    /// Build a timestamped event carrying this factory's context
    pub fn event(&self, name: impl Into<String>, payload: Value) -> TelemetryEvent {
        TelemetryEvent {
            name: name.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
            title_id: self.context.title_id.clone(),
            player_id: self.context.player_id.clone(),
            session_id: self.context.session_id.clone(),
            payload,
        }
    }
}
