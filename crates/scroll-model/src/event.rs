//! Scroll event types for the Wheelguard event stream.
//!
//! Raw wheel logs are recorded in append-only JSONL format for crash safety.
//! Timestamps are milliseconds on a monotonic clock anchored at hook start.

use serde::{Deserialize, Serialize};

/// Monotonic timestamp in milliseconds since the hook clock epoch.
pub type TimestampMs = u64;

/// Direction of a single wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Classify a raw wheel delta. Positive deltas scroll up, as on every
    /// platform hook we receive from. A zero delta carries no direction.
    pub fn from_delta(delta: i32) -> Option<Self> {
        match delta {
            d if d > 0 => Some(Self::Up),
            d if d < 0 => Some(Self::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A single wheel tick delivered by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollEvent {
    /// Monotonic milliseconds since the hook clock epoch.
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,

    #[serde(rename = "dir")]
    pub direction: ScrollDirection,
}

impl ScrollEvent {
    pub fn new(direction: ScrollDirection, timestamp_ms: TimestampMs) -> Self {
        Self {
            timestamp_ms,
            direction,
        }
    }

    pub fn up(timestamp_ms: TimestampMs) -> Self {
        Self::new(ScrollDirection::Up, timestamp_ms)
    }

    pub fn down(timestamp_ms: TimestampMs) -> Self {
        Self::new(ScrollDirection::Down, timestamp_ms)
    }

    /// Timestamp as fractional seconds since the clock epoch.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1_000.0
    }
}

/// Header line of a raw wheel log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Wall-clock time at the clock epoch (ISO 8601).
    pub epoch_wall: String,

    /// Name of the source that produced the events (evdev, replay, ...).
    pub source: String,

    /// Device name, when the source knows it.
    #[serde(default)]
    pub device: Option<String>,
}

/// Parse events from JSONL content (one JSON object per line).
///
/// Blank lines and `#` header lines are skipped.
pub fn parse_events(jsonl: &str) -> Result<Vec<ScrollEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize events to JSONL format.
pub fn serialize_events(events: &[ScrollEvent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}

/// Inter-event gaps in milliseconds for an ordered sequence.
///
/// Out-of-order pairs produce no gap rather than wrapping around.
pub fn gaps_ms(events: &[ScrollEvent]) -> Vec<u64> {
    events
        .windows(2)
        .filter_map(|pair| pair[1].timestamp_ms.checked_sub(pair[0].timestamp_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_is_compact() {
        let event = ScrollEvent::down(1234);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"t":1234,"dir":"down"}"#);
    }

    #[test]
    fn test_parse_events_skips_header_comment() {
        let jsonl = "# {\"schema_version\":\"1.0\"}\n\n{\"t\":0,\"dir\":\"up\"}\n{\"t\":12,\"dir\":\"down\"}\n";
        let parsed = parse_events(jsonl).unwrap();
        assert_eq!(parsed, vec![ScrollEvent::up(0), ScrollEvent::down(12)]);
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let events = vec![ScrollEvent::down(0), ScrollEvent::down(40), ScrollEvent::up(55)];
        let jsonl = serialize_events(&events).unwrap();
        assert_eq!(parse_events(&jsonl).unwrap(), events);
    }

    #[test]
    fn test_direction_from_delta() {
        assert_eq!(ScrollDirection::from_delta(120), Some(ScrollDirection::Up));
        assert_eq!(ScrollDirection::from_delta(-1), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::from_delta(0), None);
        assert_eq!(ScrollDirection::Up.reversed(), ScrollDirection::Down);
    }

    #[test]
    fn test_gaps_skip_out_of_order_pairs() {
        let events = vec![
            ScrollEvent::down(100),
            ScrollEvent::down(130),
            ScrollEvent::down(120),
            ScrollEvent::down(160),
        ];
        assert_eq!(gaps_ms(&events), vec![30, 40]);
    }
}
