use serde::{Deserialize, Serialize};

/// Form body for `/cmd/validate` and `/seqedit/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Raw entry of the `/events` feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

pub const SEQUENCE_EXEC_START: &str = "sequence-exec-start";
pub const SEQUENCE_EXEC_DONE: &str = "sequence-exec-done";
pub const SEQUENCE_EXEC_ERROR: &str = "sequence-exec-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    ExecStart,
    ExecDone,
    ExecError,
}

impl SequenceEvent {
    pub fn from_envelope(envelope: &EventEnvelope) -> Option<Self> {
        match envelope.name.as_str() {
            SEQUENCE_EXEC_START => Some(Self::ExecStart),
            SEQUENCE_EXEC_DONE => Some(Self::ExecDone),
            SEQUENCE_EXEC_ERROR => Some(Self::ExecError),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ExecStart => SEQUENCE_EXEC_START,
            Self::ExecDone => SEQUENCE_EXEC_DONE,
            Self::ExecError => SEQUENCE_EXEC_ERROR,
        }
    }

    /// Whether a sequence is running once this event has been observed.
    pub fn sequence_running(self) -> bool {
        matches!(self, Self::ExecStart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sequence_events_and_ignores_others() {
        let feed: Vec<EventEnvelope> = serde_json::from_str(
            r#"[
                {"type": "sequence-exec-start", "data": {"seq": "boot.txt"}},
                {"type": "telemetry-packet"},
                {"type": "sequence-exec-error", "data": "aborted"}
            ]"#,
        )
        .expect("parse feed");
        let events: Vec<SequenceEvent> =
            feed.iter().filter_map(SequenceEvent::from_envelope).collect();
        assert_eq!(
            events,
            vec![SequenceEvent::ExecStart, SequenceEvent::ExecError]
        );
        assert!(SequenceEvent::ExecStart.sequence_running());
        assert!(!SequenceEvent::ExecDone.sequence_running());
    }
}
