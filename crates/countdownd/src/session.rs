//! The user-facing side of the timer: what the controls allow, and what
//! the `HH:MM:SS` display shows.
//!
//! Like [`crate::countdown::Countdown`], this is a pure state machine that
//! returns [`Action`]s for the caller to perform. Pausing stops the engine;
//! resuming starts it afresh from whatever the display shows.

use countdown_core::event::{SessionPhase, TimerEvent};
use countdown_core::fields::{DurationFields, InputError};
use tracing::debug;

/// Actions that the session wants the caller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// (Re)start the engine with this many milliseconds.
    StartEngine(u64),
    /// Cancel the engine's countdown.
    StopEngine,
    /// Forward an event to subscribed clients.
    Broadcast(TimerEvent),
    /// Run the expiry alert.
    Alert,
}

pub struct Session {
    phase: SessionPhase,
    display: DurationFields,
    remaining_ms: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            display: DurationFields::zero(),
            remaining_ms: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn display(&self) -> DurationFields {
        self.display
    }

    /// Last known time left: the start duration or the latest tick.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Start a fresh countdown from any phase.
    pub fn start(&mut self, duration_ms: u64) -> Result<Vec<Action>, InputError> {
        if duration_ms == 0 {
            return Err(InputError::ZeroDuration);
        }
        self.run(duration_ms);
        Ok(vec![Action::StartEngine(duration_ms)])
    }

    pub fn pause(&mut self) -> Vec<Action> {
        if self.phase != SessionPhase::Running {
            return Vec::new();
        }
        debug!(display = %self.display, "pausing");
        self.phase = SessionPhase::Paused;
        vec![Action::StopEngine]
    }

    /// Restart from the displayed time. Sub-second remainders are lost.
    pub fn resume(&mut self) -> Result<Vec<Action>, InputError> {
        if self.phase != SessionPhase::Paused {
            return Ok(Vec::new());
        }
        let duration_ms = self.display.ensure_startable()?;
        debug!(display = %self.display, "resuming");
        self.run(duration_ms);
        Ok(vec![Action::StartEngine(duration_ms)])
    }

    pub fn stop(&mut self) -> Vec<Action> {
        if self.phase == SessionPhase::Idle {
            return Vec::new();
        }
        self.reset();
        vec![Action::StopEngine]
    }

    /// React to an engine event. Events arriving while not running are
    /// leftovers of a cancelled countdown and are dropped.
    pub fn on_event(&mut self, event: TimerEvent) -> Vec<Action> {
        if self.phase != SessionPhase::Running {
            debug!(?event, phase = ?self.phase, "ignoring event while not running");
            return Vec::new();
        }
        match event {
            TimerEvent::Tick { remaining_ms } => {
                self.remaining_ms = remaining_ms;
                self.display = DurationFields::from_millis(remaining_ms);
                vec![Action::Broadcast(event)]
            }
            TimerEvent::Finished => {
                self.reset();
                vec![Action::Broadcast(event), Action::Alert]
            }
        }
    }

    fn run(&mut self, duration_ms: u64) {
        self.phase = SessionPhase::Running;
        self.remaining_ms = duration_ms;
        self.display = DurationFields::from_millis(duration_ms);
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.remaining_ms = 0;
        self.display = DurationFields::zero();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
