use serde::{Deserialize, Serialize};

/// Notification published by a running countdown.
///
/// Progress and natural completion are distinct variants; a manual stop
/// publishes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Time left after one more interval elapsed. Always > 0.
    Tick { remaining_ms: u64 },
    /// The countdown reached zero on its own. Published exactly once.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Never started, or the last countdown finished.
    #[default]
    Idle,
    Running,
    /// Cancelled by `stop` before reaching zero.
    Stopped,
}

impl EngineState {
    pub fn is_running(self) -> bool {
        self == EngineState::Running
    }
}

/// What the user-facing controls currently offer: Start, Pause, or Resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    Paused,
}
