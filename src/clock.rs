//! Elapsed-time accounting for a single lesson attempt.
//!
//! All arithmetic works on epoch milliseconds taken as explicit arguments so
//! tests can drive a synthetic clock; the `_at`-less wrappers read the real
//! one.

use chrono::Utc;
use uuid::Uuid;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One learner's timed attempt at a single lesson. Client-local and
/// ephemeral: it lives in memory from start to end/abandon and is never
/// persisted.
#[derive(Debug, Clone)]
pub struct LessonSession {
    /// Client-generated id correlating local logs with backend records.
    pub id: Uuid,
    pub lesson_id: String,
    pub subject_label: String,
    pub lesson_title: String,
    /// Epoch milliseconds at construction.
    pub start_time: i64,
    /// Cumulative paused milliseconds. Only grows, and only at resume time.
    pub paused_ms: i64,
    pub is_paused: bool,
    pause_started_at: Option<i64>,
    /// Backend id, set once when the open call succeeds.
    pub remote_session_id: Option<i64>,
}

/// Final accounting for an ended session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTotals {
    pub total_seconds: u64,
    pub paused_seconds: u64,
    /// Wall time minus paused time; the metric reported as time studied.
    pub effective_seconds: u64,
    pub key_events: u64,
    pub pointer_events: u64,
}

impl LessonSession {
    pub fn start(
        lesson_id: impl Into<String>,
        subject_label: impl Into<String>,
        lesson_title: impl Into<String>,
    ) -> Self {
        Self::start_at(lesson_id, subject_label, lesson_title, now_ms())
    }

    pub fn start_at(
        lesson_id: impl Into<String>,
        subject_label: impl Into<String>,
        lesson_title: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lesson_id: lesson_id.into(),
            subject_label: subject_label.into(),
            lesson_title: lesson_title.into(),
            start_time: now_ms,
            paused_ms: 0,
            is_paused: false,
            pause_started_at: None,
            remote_session_id: None,
        }
    }

    /// Records the backend id after a successful open call. A second call is
    /// ignored; the remote linkage never changes once established.
    pub fn link(&mut self, remote_id: i64) {
        if self.remote_session_id.is_some() {
            log::warn!(
                "session {}: already linked, ignoring remote id {}",
                self.id,
                remote_id
            );
            return;
        }
        self.remote_session_id = Some(remote_id);
    }

    pub fn pause(&mut self) {
        self.pause_at(now_ms());
    }

    /// No-op when already paused. Only records the pause instant; the delta
    /// is added to `paused_ms` at resume time.
    pub fn pause_at(&mut self, now_ms: i64) {
        if self.is_paused {
            return;
        }
        self.is_paused = true;
        self.pause_started_at = Some(now_ms);
    }

    pub fn resume(&mut self) {
        self.resume_at(now_ms());
    }

    /// No-op when not paused.
    pub fn resume_at(&mut self, now_ms: i64) {
        if !self.is_paused {
            return;
        }
        if let Some(paused_at) = self.pause_started_at.take() {
            self.paused_ms += (now_ms - paused_at).max(0);
        }
        self.is_paused = false;
    }

    // Paused total including a still-open pause interval, so elapsed time
    // freezes at the pause instant instead of creeping until resume.
    fn paused_ms_at(&self, now_ms: i64) -> i64 {
        match self.pause_started_at {
            Some(paused_at) if self.is_paused => self.paused_ms + (now_ms - paused_at).max(0),
            _ => self.paused_ms,
        }
    }

    /// Whole seconds of effective study time: `(now - start) - paused`,
    /// clamped at zero if the wall clock moved backwards mid-session.
    pub fn elapsed_seconds(&self, now_ms: i64) -> u64 {
        let effective_ms = (now_ms - self.start_time) - self.paused_ms_at(now_ms);
        (effective_ms.max(0) / 1000) as u64
    }

    /// Computes the end-of-session totals from the same formula the ticks
    /// use. Called exactly once, when the session ends.
    pub fn finalize_at(&self, now_ms: i64, key_events: u64, pointer_events: u64) -> SessionTotals {
        let total_ms = (now_ms - self.start_time).max(0);
        let paused_ms = self.paused_ms_at(now_ms).max(0).min(total_ms);
        let effective_ms = total_ms - paused_ms;
        SessionTotals {
            total_seconds: (total_ms / 1000) as u64,
            paused_seconds: (paused_ms / 1000) as u64,
            effective_seconds: (effective_ms / 1000) as u64,
            key_events,
            pointer_events,
        }
    }
}
