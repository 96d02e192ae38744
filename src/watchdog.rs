//! Detects sustained idleness and focus loss during an active session.
//!
//! The host shell forwards raw interaction and visibility signals; the
//! watchdog turns them into at most one behavior event per detection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::clock;
use crate::models::ActivityKind;

/// Interaction signals that count as user activity and rearm the idle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerMove,
    PointerPress,
    KeyPress,
    Scroll,
    TouchStart,
}

/// Receives one call per detected behavior event.
///
/// The production sink forwards to the session API; tests record.
pub trait ActivitySink: Send + Sync {
    fn record(&self, kind: ActivityKind, note: &str);
}

pub struct WatchState {
    pub last_activity_ms: AtomicU64,
    pub is_watching: AtomicBool,
    pub document_hidden: AtomicBool,
    pub key_count: AtomicU64,
    pub pointer_count: AtomicU64,

    pub is_idle_loop_running: AtomicBool,
}

impl WatchState {
    pub fn new() -> Self {
        Self {
            last_activity_ms: AtomicU64::new(clock::now_ms() as u64),
            is_watching: AtomicBool::new(false),
            document_hidden: AtomicBool::new(false),
            key_count: AtomicU64::new(0),
            pointer_count: AtomicU64::new(0),
            is_idle_loop_running: AtomicBool::new(false),
        }
    }
}

impl Default for WatchState {
    fn default() -> Self {
        Self::new()
    }
}

// One idle check. Fires at most one event and rearms the timer, so the next
// uninterrupted window fires again.
fn poll_idle(
    state: &WatchState,
    sink: &dyn ActivitySink,
    threshold_ms: u64,
    now_ms: u64,
) -> bool {
    if !state.is_watching.load(Ordering::Relaxed) {
        return false;
    }
    let last = state.last_activity_ms.load(Ordering::Relaxed);
    if now_ms.saturating_sub(last) < threshold_ms {
        return false;
    }
    state.last_activity_ms.store(now_ms, Ordering::Relaxed);
    sink.record(
        ActivityKind::Idle,
        &format!("no qualifying interaction for {}s", threshold_ms / 1000),
    );
    true
}

pub struct Watchdog {
    state: Arc<WatchState>,
    sink: Arc<dyn ActivitySink>,
    idle_threshold: Duration,
}

impl Watchdog {
    pub fn new(sink: Arc<dyn ActivitySink>, idle_threshold: Duration) -> Self {
        Self {
            state: Arc::new(WatchState::new()),
            sink,
            idle_threshold,
        }
    }

    pub fn state(&self) -> Arc<WatchState> {
        Arc::clone(&self.state)
    }

    /// Arms the watchdog and spawns the idle-check loop.
    pub fn start(&self) {
        self.state
            .last_activity_ms
            .store(clock::now_ms() as u64, Ordering::Relaxed);
        self.state.key_count.store(0, Ordering::Relaxed);
        self.state.pointer_count.store(0, Ordering::Relaxed);
        self.state.document_hidden.store(false, Ordering::Relaxed);
        self.state.is_watching.store(true, Ordering::SeqCst);

        // Ensure only one loop runs
        if self.state.is_idle_loop_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let threshold_ms = self.idle_threshold.as_millis() as u64;

        thread::spawn(move || {
            log::debug!("watchdog: starting idle loop");
            loop {
                thread::sleep(Duration::from_secs(1));

                // EXIT LOOP once the session is gone
                if !state.is_watching.load(Ordering::Relaxed) {
                    log::debug!("watchdog: stopping idle loop (inactive)");
                    state.is_idle_loop_running.store(false, Ordering::SeqCst);
                    break;
                }

                poll_idle(&state, sink.as_ref(), threshold_ms, clock::now_ms() as u64);
            }
        });
    }

    /// Disarms the watchdog. Interaction and visibility signals are ignored
    /// from here on and the idle loop exits on its next tick.
    pub fn stop(&self) {
        self.state.is_watching.store(false, Ordering::SeqCst);
    }

    /// A qualifying interaction: rearms the idle timer and bumps the
    /// matching counter.
    pub fn interaction(&self, interaction: Interaction) {
        if !self.state.is_watching.load(Ordering::Relaxed) {
            return;
        }
        self.state
            .last_activity_ms
            .store(clock::now_ms() as u64, Ordering::Relaxed);
        match interaction {
            Interaction::KeyPress => {
                self.state.key_count.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.state.pointer_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Visibility change from the host. Exactly one `focus_loss` event per
    /// transition to hidden; staying hidden emits nothing further.
    pub fn visibility_changed(&self, hidden: bool) {
        let was_hidden = self.state.document_hidden.swap(hidden, Ordering::SeqCst);
        if !self.state.is_watching.load(Ordering::Relaxed) {
            return;
        }
        if hidden && !was_hidden {
            self.sink
                .record(ActivityKind::FocusLoss, "document hidden during session");
        }
    }

    /// Page teardown while a session is active. Best-effort; the host calls
    /// this before the final close.
    pub fn notify_unload(&self) {
        if !self.state.is_watching.load(Ordering::Relaxed) {
            return;
        }
        self.sink
            .record(ActivityKind::TabSwitch, "page unloading during session");
    }

    /// Interaction counters since `start()`, as (key, pointer).
    pub fn counters(&self) -> (u64, u64) {
        (
            self.state.key_count.load(Ordering::Relaxed),
            self.state.pointer_count.load(Ordering::Relaxed),
        )
    }
}
