use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Behavior signals reported to the activity-log endpoint.
///
/// One event per detection, never a continuous stream.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Idle,
    FocusLoss,
    TabSwitch,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Idle => "idle",
            ActivityKind::FocusLoss => "focus_loss",
            ActivityKind::TabSwitch => "tab_switch",
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionPayload {
    pub lesson_id: String,
    pub student_id: String,
    pub institution_id: String,
    pub client_uuid: Uuid,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionPayload {
    /// End timestamp as an ISO-8601 string.
    pub end_time: String,
    pub is_active: bool,
    pub effective_seconds: u64,
    pub paused_seconds: u64,
    pub key_events: u64,
    pub pointer_events: u64,
}

/// Session record as the backend returns it from the open call.
///
/// Only the numeric id matters to the engine; the rest is echoed metadata
/// and parsed leniently.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: i64,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
