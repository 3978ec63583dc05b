//! Engine configuration: the subset of service configuration the mutable
//! state consults directly.

/// Defaults applied when a decision omits an activity timeout (absent or
/// non-positive values fall back to these).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_schedule_to_start_activity_timeout_seconds: i32,
    pub default_schedule_to_close_activity_timeout_seconds: i32,
    pub default_start_to_close_activity_timeout_seconds: i32,
    /// Ships as 0: an activity without an explicit heartbeat timeout does not
    /// heartbeat.
    pub default_heartbeat_activity_timeout_seconds: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_schedule_to_start_activity_timeout_seconds: 10,
            default_schedule_to_close_activity_timeout_seconds: 10,
            default_start_to_close_activity_timeout_seconds: 10,
            default_heartbeat_activity_timeout_seconds: 0,
        }
    }
}
