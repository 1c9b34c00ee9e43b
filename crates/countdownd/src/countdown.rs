//! Pure countdown schedule: decides when the next firing is due and what it
//! publishes. Owns no task and never reads the clock; the caller passes
//! `now` and sleeps until `next_deadline()`.
//!
//! ```text
//! Idle --start--> Running --firing (remaining > 0)--> Running   [Tick]
//!                 Running --firing (remaining == 0)--> Idle     [Finished]
//!                 Running --stop--> Stopped
//! ```

use countdown_core::event::{EngineState, TimerEvent};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Running {
        started: Instant,
        duration_ms: u64,
        /// Firings already published.
        fired: u64,
    },
    Stopped,
}

pub struct Countdown {
    state: State,
    tick_interval_ms: u64,
}

impl Countdown {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            state: State::Idle,
            tick_interval_ms: u64::try_from(tick_interval.as_millis())
                .unwrap_or(u64::MAX)
                .max(1),
        }
    }

    pub fn state(&self) -> EngineState {
        match self.state {
            State::Idle => EngineState::Idle,
            State::Running { .. } => EngineState::Running,
            State::Stopped => EngineState::Stopped,
        }
    }

    /// Begin counting down `duration_ms` from `now`, discarding any
    /// countdown in progress.
    pub fn start(&mut self, duration_ms: u64, now: Instant) {
        self.state = State::Running {
            started: now,
            duration_ms,
            fired: 0,
        };
    }

    /// Cancel a running countdown. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        if matches!(self.state, State::Running { .. }) {
            self.state = State::Stopped;
            true
        } else {
            false
        }
    }

    /// When `check_timer()` next has something to publish, or `None` if
    /// not running.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Running {
                started,
                duration_ms,
                fired,
            } => Some(started + Duration::from_millis(self.firing_offset_ms(duration_ms, fired))),
            _ => None,
        }
    }

    /// Publish the next firing if it is due at `now`.
    ///
    /// At most one event per call; a caller that fell behind gets the
    /// missed firings in order on subsequent calls.
    pub fn check_timer(&mut self, now: Instant) -> Option<TimerEvent> {
        let State::Running {
            started,
            duration_ms,
            fired,
        } = self.state
        else {
            return None;
        };

        let offset_ms = self.firing_offset_ms(duration_ms, fired);
        if now < started + Duration::from_millis(offset_ms) {
            return None;
        }

        let remaining_ms = duration_ms - offset_ms;
        if remaining_ms == 0 {
            debug!(duration_ms, "countdown reached zero");
            self.state = State::Idle;
            return Some(TimerEvent::Finished);
        }

        self.state = State::Running {
            started,
            duration_ms,
            fired: fired + 1,
        };
        Some(TimerEvent::Tick { remaining_ms })
    }

    /// Offset from start of the firing after `fired` ones: the next whole
    /// interval, capped at the duration so expiry is never late.
    fn firing_offset_ms(&self, duration_ms: u64, fired: u64) -> u64 {
        fired
            .saturating_add(1)
            .saturating_mul(self.tick_interval_ms)
            .min(duration_ms)
    }
}
