//! Trace signals raised by simulated entities.

use std::fmt;
use std::str::FromStr;

use crate::id::SubjectId;
use crate::time::SimTime;

/// The kind of state change a [`TraceSignal`] reports.
///
/// A closed set: the telemetry bridge only needs to tell these apart.
/// New kinds are added here together with their wire tag.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    /// Remaining energy of a source changed; value is in joules.
    Energy,
    /// A packet was received; value is the packet size in bytes.
    Packet,
}

impl SignalKind {
    /// Every kind, in wire-tag order.
    pub const ALL: [SignalKind; 2] = [SignalKind::Energy, SignalKind::Packet];

    /// The tag written in the first field of a wire record.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Energy => "ENERGY",
            Self::Packet => "PKT",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

/// Error returned when a wire tag names no known [`SignalKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown signal kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for SignalKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.wire_tag() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A single observable state change.
///
/// `time` is the virtual time of the event whose handler raised the
/// signal, so signals observed in dispatch order have non-decreasing
/// timestamps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceSignal {
    /// What changed.
    pub kind: SignalKind,
    /// The entity it changed on.
    pub subject: SubjectId,
    /// The new value (joules, bytes, ...).
    pub value: f64,
    /// When it changed, in virtual time.
    pub time: SimTime,
}

impl TraceSignal {
    /// Construct a signal.
    pub fn new(kind: SignalKind, subject: SubjectId, value: f64, time: SimTime) -> Self {
        Self {
            kind,
            subject,
            value,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_parse_back() {
        for kind in SignalKind::ALL {
            assert_eq!(kind.wire_tag().parse::<SignalKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "TEMP".parse::<SignalKind>().unwrap_err();
        assert_eq!(err, UnknownKind("TEMP".into()));
        assert_eq!(err.to_string(), "unknown signal kind 'TEMP'");
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!("energy".parse::<SignalKind>().is_err());
        assert!("Pkt".parse::<SignalKind>().is_err());
    }
}
