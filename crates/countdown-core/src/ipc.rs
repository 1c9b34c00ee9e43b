use crate::event::{EngineState, SessionPhase, TimerEvent};
use crate::fields::DurationFields;
use serde::{Deserialize, Serialize};

/// Messages from daemon to clients (JSON-lines over Unix socket).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMsg {
    /// Countdown progress, sent to subscribed clients.
    #[serde(rename = "tick")]
    Tick {
        remaining_ms: u64,
        /// `HH:MM:SS`
        display: String,
    },
    /// The countdown reached zero.
    #[serde(rename = "finished")]
    Finished { message: String },
    /// Status response.
    #[serde(rename = "status")]
    Status {
        phase: SessionPhase,
        engine: EngineState,
        display: String,
        remaining_ms: u64,
        version: String,
    },
    /// Acknowledgement for commands.
    #[serde(rename = "ack")]
    Ack { ok: bool, message: String },
}

impl DaemonMsg {
    /// Wire form of a timer event. `message` is only used for `Finished`.
    pub fn from_event(event: TimerEvent, message: &str) -> Self {
        match event {
            TimerEvent::Tick { remaining_ms } => DaemonMsg::Tick {
                remaining_ms,
                display: DurationFields::from_millis(remaining_ms).to_string(),
            },
            TimerEvent::Finished => DaemonMsg::Finished {
                message: message.to_string(),
            },
        }
    }

    pub fn ack(message: impl Into<String>) -> Self {
        DaemonMsg::Ack {
            ok: true,
            message: message.into(),
        }
    }

    pub fn nack(message: impl Into<String>) -> Self {
        DaemonMsg::Ack {
            ok: false,
            message: message.into(),
        }
    }
}

/// Messages from clients to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Start a fresh countdown, replacing any current one.
    #[serde(rename = "start")]
    Start { duration_ms: u64 },
    /// Stop the countdown but keep the remaining time on display.
    #[serde(rename = "pause")]
    Pause,
    /// Restart from the remaining time on display.
    #[serde(rename = "resume")]
    Resume,
    /// Stop the countdown and clear the display.
    #[serde(rename = "stop")]
    Stop,
    /// Receive `tick`/`finished` messages on this connection.
    #[serde(rename = "subscribe")]
    Subscribe,
    /// Request current status.
    #[serde(rename = "get_status")]
    GetStatus,
}

/// Serialize a message as a JSON line (with trailing newline).
pub fn encode(msg: &impl Serialize) -> String {
    let mut s = serde_json::to_string(msg).expect("serialize IPC message");
    s.push('\n');
    s
}

/// Deserialize a JSON line. Returns None on empty/whitespace input.
pub fn decode_daemon(line: &str) -> Option<DaemonMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

pub fn decode_client(line: &str) -> Option<ClientMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
