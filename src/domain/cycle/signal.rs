//! Machine state-change signals decoded from bus messages.
//!
//! The hub publishes one message per transition:
//!
//! - topic: hierarchical path whose last segment names the machine (`home/laundry/dryer`)
//! - payload: `<key>=<RFC 3339 timestamp>` with key `started_at` or `finished_at`

use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{MachineType, Timestamp};

/// Reasons a bus message cannot be turned into a signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalParseError {
    #[error("topic '{0}' has no machine segment")]
    EmptyTopic(String),

    #[error("unknown machine type '{0}'")]
    UnknownMachineType(String),

    #[error("payload '{0}' is not of the form key=value")]
    MissingSeparator(String),

    #[error("unknown payload key '{0}'")]
    UnknownKey(String),

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// Which transition a signal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Started,
    Finished,
}

impl SignalKind {
    /// Payload key used on the bus.
    pub fn key(&self) -> &'static str {
        match self {
            SignalKind::Started => "started_at",
            SignalKind::Finished => "finished_at",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A decoded start or finish report for one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSignal {
    pub machine_type: MachineType,
    pub kind: SignalKind,
    pub at: Timestamp,
}

impl MachineSignal {
    pub fn started(machine_type: MachineType, at: Timestamp) -> Self {
        Self {
            machine_type,
            kind: SignalKind::Started,
            at,
        }
    }

    pub fn finished(machine_type: MachineType, at: Timestamp) -> Self {
        Self {
            machine_type,
            kind: SignalKind::Finished,
            at,
        }
    }

    /// Decodes a (topic, payload) pair delivered by the bus.
    pub fn parse(topic: &str, payload: &str) -> Result<Self, SignalParseError> {
        let machine_type = parse_machine_type(topic)?;

        let (key, value) = payload
            .trim()
            .split_once('=')
            .ok_or_else(|| SignalParseError::MissingSeparator(payload.to_string()))?;

        let kind = match key.trim() {
            "started_at" => SignalKind::Started,
            "finished_at" => SignalKind::Finished,
            other => return Err(SignalParseError::UnknownKey(other.to_string())),
        };

        let at = Timestamp::parse_rfc3339(value).map_err(|e| {
            SignalParseError::InvalidTimestamp {
                value: value.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            machine_type,
            kind,
            at,
        })
    }
}

fn parse_machine_type(topic: &str) -> Result<MachineType, SignalParseError> {
    let leaf = topic
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim();

    if leaf.is_empty() {
        return Err(SignalParseError::EmptyTopic(topic.to_string()));
    }

    leaf.parse::<MachineType>()
        .map_err(|_| SignalParseError::UnknownMachineType(leaf.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_start_signal() {
        let signal =
            MachineSignal::parse("home/laundry/dryer", "started_at=2024-01-01T10:00:00Z").unwrap();

        assert_eq!(signal.machine_type, MachineType::Dryer);
        assert_eq!(signal.kind, SignalKind::Started);
        assert_eq!(signal.at.to_rfc3339(), "2024-01-01T10:00:00Z");
    }

    #[test]
    fn parses_finish_signal_on_bare_topic() {
        let signal = MachineSignal::parse("washer", "finished_at=2024-01-01T11:00:00+00:00").unwrap();
        assert_eq!(signal.machine_type, MachineType::Washer);
        assert_eq!(signal.kind, SignalKind::Finished);
    }

    #[test]
    fn tolerates_trailing_slash_and_whitespace() {
        let signal =
            MachineSignal::parse("home/laundry/Washer/", " started_at = 2024-01-01T10:00:00Z \n")
                .unwrap();
        assert_eq!(signal.machine_type, MachineType::Washer);
    }

    #[test]
    fn rejects_missing_separator() {
        let err = MachineSignal::parse("home/dryer", "started_at").unwrap_err();
        assert!(matches!(err, SignalParseError::MissingSeparator(_)));
    }

    #[test]
    fn rejects_unknown_key() {
        let err = MachineSignal::parse("home/dryer", "paused_at=2024-01-01T10:00:00Z").unwrap_err();
        assert_eq!(err, SignalParseError::UnknownKey("paused_at".to_string()));
    }

    #[test]
    fn rejects_bad_timestamp() {
        let err = MachineSignal::parse("home/dryer", "finished_at=soon").unwrap_err();
        assert!(matches!(err, SignalParseError::InvalidTimestamp { .. }));
    }

    #[test]
    fn rejects_unknown_machine() {
        let err = MachineSignal::parse("home/laundry/oven", "started_at=2024-01-01T10:00:00Z")
            .unwrap_err();
        assert_eq!(err, SignalParseError::UnknownMachineType("oven".to_string()));
    }

    #[test]
    fn rejects_empty_topic() {
        let err = MachineSignal::parse("", "started_at=2024-01-01T10:00:00Z").unwrap_err();
        assert!(matches!(err, SignalParseError::EmptyTopic(_)));
    }

    proptest! {
        #[test]
        fn parse_never_panics(topic in ".{0,40}", payload in ".{0,60}") {
            let _ = MachineSignal::parse(&topic, &payload);
        }

        #[test]
        fn any_leaf_prefix_is_ignored(prefix in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
            let topic = format!("{}/dryer", prefix);
            let signal = MachineSignal::parse(&topic, "finished_at=2024-01-01T11:00:00Z").unwrap();
            prop_assert_eq!(signal.machine_type, MachineType::Dryer);
        }
    }
}
