//! Shared test infrastructure for integration tests
//!
//! Provides an in-memory gate harness, a clock that follows tokio's (possibly
//! paused) timer, and a viewport that records what a page did.

#![allow(dead_code)]

use medone_gate::clock::{Clock, ManualClock};
use medone_gate::config::GateConfig;
use medone_gate::session::SessionGate;
use medone_gate::storage::MemoryStorage;
use parking_lot::Mutex;
use std::sync::Arc;

pub const T0: i64 = 1_750_000_000_000;
pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "medone2025";

/// Gate wired to two in-memory stores and a manual clock.
pub struct Harness {
    pub tab: Arc<MemoryStorage>,
    pub durable: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub gate: Arc<SessionGate>,
    pub config: GateConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        let tab = Arc::new(MemoryStorage::new());
        let durable = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let gate = Arc::new(SessionGate::new(
            &config,
            tab.clone(),
            durable.clone(),
            clock.clone(),
        ));
        Self {
            tab,
            durable,
            clock,
            gate,
            config,
        }
    }

    /// Rebuild the gate over the same durable store and a fresh tab store,
    /// the way reopening the browser would.
    pub fn reopen_tab(&self) -> Self {
        let tab = Arc::new(MemoryStorage::new());
        let gate = Arc::new(SessionGate::new(
            &self.config,
            tab.clone(),
            self.durable.clone(),
            self.clock.clone(),
        ));
        Self {
            tab,
            durable: self.durable.clone(),
            clock: self.clock.clone(),
            gate,
            config: self.config.clone(),
        }
    }
}

/// Wall clock pinned to `T0` at creation and driven by tokio's timer, so
/// paused-time tests can move both together.
pub struct TokioClock {
    base_ms: i64,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base_ms: i64) -> Self {
        Self {
            base_ms,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.base_ms + self.start.elapsed().as_millis() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportEvent {
    Navigate(String),
    Alert(String),
    Confirm(String),
    Error(String),
    FocusPassword,
}

/// Viewport that records every call and answers prompts with a fixed reply.
pub struct RecordingViewport {
    events: Mutex<Vec<ViewportEvent>>,
    confirm_reply: bool,
}

impl RecordingViewport {
    pub fn new(confirm_reply: bool) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            confirm_reply,
        })
    }

    pub fn events(&self) -> Vec<ViewportEvent> {
        self.events.lock().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ViewportEvent::Navigate(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

impl medone_gate::page::Viewport for RecordingViewport {
    fn navigate(&self, url: &str) {
        self.events.lock().push(ViewportEvent::Navigate(url.to_string()));
    }

    fn alert(&self, message: &str) {
        self.events.lock().push(ViewportEvent::Alert(message.to_string()));
    }

    fn confirm(&self, message: &str) -> bool {
        self.events
            .lock()
            .push(ViewportEvent::Confirm(message.to_string()));
        self.confirm_reply
    }

    fn show_error(&self, message: &str) {
        self.events.lock().push(ViewportEvent::Error(message.to_string()));
    }

    fn focus_password(&self) {
        self.events.lock().push(ViewportEvent::FocusPassword);
    }
}
