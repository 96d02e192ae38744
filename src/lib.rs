//! studywatch: lesson session tracking for the learner client.
//!
//! Tracks one timed lesson attempt at a time — start, pause/resume, end —
//! net of paused intervals, watches for idleness and focus loss while the
//! attempt is active, and reports lifecycle transitions and behavior events
//! to the platform's session API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::runtime::Handle;

mod clock;
mod config;
mod error;
mod gateway;
mod models;
mod watchdog;

pub use clock::{now_ms, LessonSession, SessionTotals};
pub use config::Config;
pub use error::{Result, TrackError};
pub use gateway::{RemoteActivitySink, SessionGateway};
pub use models::{ActivityKind, RemoteSession};
pub use watchdog::{ActivitySink, Interaction, WatchState, Watchdog};

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

struct TrackerShared {
    active: Mutex<Option<LessonSession>>,
    watchdog: Mutex<Option<Watchdog>>,
    elapsed_secs: AtomicU64,
    is_ticker_running: AtomicBool,
}

/// Owns the at-most-one active lesson session and wires the clock, the
/// watchdog and the gateway together. The host shell holds one instance and
/// drives it from its event handlers.
pub struct LessonTracker {
    config: Config,
    gateway: Arc<SessionGateway>,
    shared: Arc<TrackerShared>,
}

impl LessonTracker {
    pub fn new(config: Config) -> Self {
        let gateway = Arc::new(SessionGateway::new(&config));
        Self {
            config,
            gateway,
            shared: Arc::new(TrackerShared {
                active: Mutex::new(None),
                watchdog: Mutex::new(None),
                elapsed_secs: AtomicU64::new(0),
                is_ticker_running: AtomicBool::new(false),
            }),
        }
    }

    /// Opens a session against the backend and begins local accounting.
    ///
    /// A session still active from a previous lesson is ended first; two
    /// attempts never run at once. If the open call fails the error is
    /// returned and no local session comes into existence.
    pub async fn start_lesson(
        &self,
        lesson_id: &str,
        subject_label: &str,
        lesson_title: &str,
    ) -> Result<i64> {
        if self.shared.active.lock().is_some() {
            log::warn!("tracker: a session is still active, ending it first");
            if let Err(e) = self.end_lesson().await {
                log::warn!("tracker: could not end previous session: {}", e);
            }
        }

        let mut session = LessonSession::start(lesson_id, subject_label, lesson_title);
        let remote = self.gateway.open_session(lesson_id, session.id).await?;
        session.link(remote.id);

        log::info!(
            "tracker: started {} ({}: {})",
            lesson_id,
            subject_label,
            lesson_title
        );

        let sink = RemoteActivitySink::new(
            Arc::clone(&self.gateway),
            Handle::current(),
            lesson_id.to_string(),
            remote.id,
        );
        let watchdog = Watchdog::new(Arc::new(sink), self.config.idle_threshold);
        watchdog.start();

        *self.shared.watchdog.lock() = Some(watchdog);
        self.shared.elapsed_secs.store(0, Ordering::Relaxed);
        *self.shared.active.lock() = Some(session);
        self.spawn_ticker();

        Ok(remote.id)
    }

    /// Freezes elapsed-time accounting. No-op if already paused.
    pub fn pause_lesson(&self) -> Result<()> {
        let mut guard = self.shared.active.lock();
        let session = guard.as_mut().ok_or(TrackError::NoActiveSession)?;
        session.pause();
        log::info!("tracker: {} paused", session.lesson_id);
        Ok(())
    }

    /// Resumes accounting, adding the pause delta to the paused total.
    pub fn resume_lesson(&self) -> Result<()> {
        let mut guard = self.shared.active.lock();
        let session = guard.as_mut().ok_or(TrackError::NoActiveSession)?;
        session.resume();
        log::info!("tracker: {} resumed", session.lesson_id);
        Ok(())
    }

    /// Ends the active session: final totals, watchdog teardown, and a
    /// best-effort remote close. A close failure is logged and swallowed —
    /// the learner is never stuck in an ended lesson over a network error.
    pub async fn end_lesson(&self) -> Result<SessionTotals> {
        let session = self
            .shared
            .active
            .lock()
            .take()
            .ok_or(TrackError::NoActiveSession)?;
        let watchdog = self.shared.watchdog.lock().take();

        let (key_events, pointer_events) = watchdog
            .as_ref()
            .map(|w| w.counters())
            .unwrap_or((0, 0));
        if let Some(w) = &watchdog {
            w.stop();
        }

        let end_ms = now_ms();
        let totals = session.finalize_at(end_ms, key_events, pointer_events);
        self.shared
            .elapsed_secs
            .store(totals.effective_seconds, Ordering::Relaxed);
        log::info!(
            "tracker: {} ended after {} effective seconds ({} paused)",
            session.lesson_id,
            totals.effective_seconds,
            totals.paused_seconds
        );

        if let Some(remote_id) = session.remote_session_id {
            if let Err(e) = self.gateway.close_session(remote_id, end_ms, &totals).await {
                // Discrepancy becomes a backend reconciliation concern.
                log::warn!("tracker: failed to close remote session {}: {}", remote_id, e);
            }
        }

        Ok(totals)
    }

    /// Best-effort teardown when the hosting view is going away: one
    /// `tab_switch` event, then the normal end path.
    pub async fn handle_unload(&self) {
        let watching = {
            let guard = self.shared.watchdog.lock();
            if let Some(w) = guard.as_ref() {
                w.notify_unload();
                true
            } else {
                false
            }
        };
        if watching {
            if let Err(e) = self.end_lesson().await {
                log::debug!("tracker: unload with no session to end: {}", e);
            }
        }
    }

    /// Forwards a qualifying interaction signal to the watchdog.
    pub fn interaction(&self, interaction: Interaction) {
        if let Some(w) = self.shared.watchdog.lock().as_ref() {
            w.interaction(interaction);
        }
    }

    /// Forwards a visibility change from the host.
    pub fn visibility_changed(&self, hidden: bool) {
        if let Some(w) = self.shared.watchdog.lock().as_ref() {
            w.visibility_changed(hidden);
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.lock().is_some()
    }

    /// Snapshot of the active session, if any.
    pub fn active_session(&self) -> Option<LessonSession> {
        self.shared.active.lock().clone()
    }

    /// Elapsed effective seconds as of the last tick. Frozen while paused,
    /// left at the final effective total after the session ends.
    pub fn elapsed_seconds(&self) -> u64 {
        self.shared.elapsed_secs.load(Ordering::Relaxed)
    }

    pub fn elapsed_display(&self) -> String {
        format_duration(self.elapsed_seconds())
    }

    // Recomputes the published elapsed value once per tick while a session
    // is active and unpaused. The loop exits when the session is gone.
    fn spawn_ticker(&self) {
        if self.shared.is_ticker_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let tick = self.config.tick_interval;

        thread::spawn(move || {
            log::debug!("tracker: elapsed ticker started");
            loop {
                thread::sleep(tick);

                let elapsed = {
                    let guard = shared.active.lock();
                    match guard.as_ref() {
                        None => {
                            shared.is_ticker_running.store(false, Ordering::SeqCst);
                            log::debug!("tracker: elapsed ticker stopped");
                            break;
                        }
                        Some(s) if !s.is_paused => Some(s.elapsed_seconds(now_ms())),
                        // Paused: the displayed value stays frozen.
                        Some(_) => None,
                    }
                };

                if let Some(secs) = elapsed {
                    shared.elapsed_secs.store(secs, Ordering::Relaxed);
                }
            }
        });
    }
}
