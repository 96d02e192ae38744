use std::time::Duration;

/// Engine configuration supplied by the host shell.
///
/// Identifiers come from whatever auth layer the host runs; the engine only
/// forwards them on the wire.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the session API, without a trailing slash.
    pub base_url: String,
    /// Bearer token attached to every request.
    pub auth_token: String,
    pub student_id: String,
    pub institution_id: String,
    /// How long without a qualifying interaction counts as idle.
    pub idle_threshold: Duration,
    /// Cadence of the elapsed-time ticker.
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            auth_token: String::new(),
            student_id: String::new(),
            institution_id: String::new(),
            idle_threshold: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
        }
    }
}
