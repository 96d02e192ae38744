//! The only component that talks to the remote session API.
//!
//! Local lifecycle transitions become remote calls here; failures come back
//! as values and never corrupt local session state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::clock::SessionTotals;
use crate::config::Config;
use crate::error::{Result, TrackError};
use crate::models::{ActivityKind, CloseSessionPayload, OpenSessionPayload, RemoteSession};
use crate::watchdog::ActivitySink;

pub struct SessionGateway {
    client: Client,
    base_url: String,
    token: String,
    student_id: String,
    institution_id: String,
}

impl SessionGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            token: config.auth_token.clone(),
            student_id: config.student_id.clone(),
            institution_id: config.institution_id.clone(),
        }
    }

    /// Requests a new session record from the backend. The caller must not
    /// create any local session state unless this returns `Ok`.
    pub async fn open_session(&self, lesson_id: &str, client_uuid: Uuid) -> Result<RemoteSession> {
        let url = format!("{}/client/lesson-sessions", self.base_url);
        let payload = OpenSessionPayload {
            lesson_id: lesson_id.to_string(),
            student_id: self.student_id.clone(),
            institution_id: self.institution_id.clone(),
            client_uuid,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::error!("gateway: open failed for lesson {}: {}", lesson_id, status);
            return Err(TrackError::api(status.as_u16(), message));
        }

        let remote: RemoteSession = response.json().await?;
        log::info!(
            "gateway: lesson {} linked to remote session {}",
            lesson_id,
            remote.id
        );
        Ok(remote)
    }

    /// Marks the remote session inactive with its final totals. A failure is
    /// the caller's to log; local state is cleared regardless.
    pub async fn close_session(
        &self,
        remote_session_id: i64,
        end_time_ms: i64,
        totals: &SessionTotals,
    ) -> Result<()> {
        let url = format!("{}/client/lesson-sessions/{}", self.base_url, remote_session_id);
        let end_time = DateTime::<Utc>::from_timestamp_millis(end_time_ms)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let payload = CloseSessionPayload {
            end_time,
            is_active: false,
            effective_seconds: totals.effective_seconds,
            paused_seconds: totals.paused_seconds,
            key_events: totals.key_events,
            pointer_events: totals.pointer_events,
        };

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TrackError::api(status.as_u16(), message));
        }
        log::info!("gateway: remote session {} closed", remote_session_id);
        Ok(())
    }

    /// Posts one behavior event. Best-effort telemetry; the response body is
    /// ignored.
    pub async fn log_activity(
        &self,
        lesson_id: &str,
        remote_session_id: i64,
        kind: ActivityKind,
        note: &str,
    ) -> Result<()> {
        let url = format!("{}/client/activity-logs", self.base_url);
        let payload = json!({
            "lessonId": lesson_id,
            "sessionId": remote_session_id,
            "studentId": self.student_id,
            "institutionId": self.institution_id,
            "kind": kind,
            "note": note,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::api(status.as_u16(), String::new()));
        }
        Ok(())
    }
}

/// Production [`ActivitySink`]: detaches one task per event so telemetry can
/// never block or fail the learning flow.
pub struct RemoteActivitySink {
    gateway: Arc<SessionGateway>,
    handle: Handle,
    lesson_id: String,
    remote_session_id: i64,
}

impl RemoteActivitySink {
    pub fn new(
        gateway: Arc<SessionGateway>,
        handle: Handle,
        lesson_id: String,
        remote_session_id: i64,
    ) -> Self {
        Self {
            gateway,
            handle,
            lesson_id,
            remote_session_id,
        }
    }
}

impl ActivitySink for RemoteActivitySink {
    fn record(&self, kind: ActivityKind, note: &str) {
        let gateway = Arc::clone(&self.gateway);
        let lesson_id = self.lesson_id.clone();
        let remote_session_id = self.remote_session_id;
        let note = note.to_string();

        self.handle.spawn(async move {
            if let Err(e) = gateway
                .log_activity(&lesson_id, remote_session_id, kind, &note)
                .await
            {
                // Quiet failure
                log::debug!("gateway: dropped {} event: {}", kind.as_str(), e);
            }
        });
    }
}
