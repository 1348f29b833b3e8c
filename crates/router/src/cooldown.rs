use core::time::Duration;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

/// Namespace of a trigger, so a JSON command and a keyword with the same
/// text cool down independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Builtin,
    Command,
    Keyword,
}

impl TriggerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Command => "command",
            Self::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub channel: Arc<str>,
    pub kind: TriggerKind,
    pub key: String,
}

impl CooldownKey {
    #[must_use]
    pub fn new(channel: &str, kind: TriggerKind, key: &str) -> Self {
        Self {
            channel: Arc::from(channel),
            kind,
            key: key.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Blocked { retry_after: Duration },
}

impl Admission {
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Admissions between automatic sweeps.
const SWEEP_EVERY: usize = 1024;

/// Per-key rate limiter: a key fires at most once per window.
///
/// Check and record happen under one lock, so concurrent callers on the same
/// key within a window get exactly one [`Admission::Admitted`]. Every
/// [`SWEEP_EVERY`] admissions, entries older than the longest window seen so
/// far are dropped; such entries can no longer block anything.
#[derive(Debug, Default)]
pub struct CooldownGate {
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    last_fired: HashMap<CooldownKey, Instant>,
    longest_window: Duration,
    since_sweep: usize,
}

impl GateState {
    fn sweep(&mut self, now: Instant) {
        let horizon = self.longest_window;
        self.last_fired
            .retain(|_, last| now.saturating_duration_since(*last) < horizon);
        self.since_sweep = 0;
    }
}

impl CooldownGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks if `key` fired less than `window` before `now`; otherwise
    /// records `now` as its last fire and admits.
    pub fn admit(&self, key: CooldownKey, now: Instant, window: Duration) -> Admission {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = state.last_fired.get(&key) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < window {
                return Admission::Blocked {
                    retry_after: window - elapsed,
                };
            }
        }

        state.last_fired.insert(key, now);
        state.longest_window = state.longest_window.max(window);
        state.since_sweep += 1;
        if state.since_sweep >= SWEEP_EVERY {
            state.sweep(now);
        }
        Admission::Admitted
    }

    /// Drops entries that can no longer block.
    pub fn sweep(&self, now: Instant) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sweep(now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_fired
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
