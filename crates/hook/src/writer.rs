//! JSONL wheel logs.
//!
//! A log is a `# {header}` line followed by one tick per line in timestamp
//! order. Raw logs keep every tick a source produced. Passed logs keep only
//! the ticks the filter let through, so replaying one shows what the
//! application actually received.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_common::HookClock;
use wheelguard_filter_core::Decision;
use wheelguard_scroll_model::{EventStreamHeader, ScrollEvent, TimestampMs};

use crate::DecisionSink;

/// Schema version written into every log header.
pub const LOG_SCHEMA_VERSION: &str = "1.0";

/// Buffered ticks between flushes.
const FLUSH_EVERY: u64 = 100;

/// Which ticks a log keeps when used as a [`DecisionSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogContents {
    Raw,
    Passed,
}

/// Header for a log written now from `source`.
pub fn log_header(
    source: impl Into<String>,
    device: Option<String>,
    clock: &HookClock,
) -> EventStreamHeader {
    EventStreamHeader {
        schema_version: LOG_SCHEMA_VERSION.to_string(),
        epoch_wall: clock.epoch_wall().to_string(),
        source: source.into(),
        device,
    }
}

/// Appends ticks to a JSONL log, refusing ticks that would go back in time.
pub struct EventWriter {
    out: BufWriter<File>,
    path: PathBuf,
    contents: LogContents,
    last_ms: Option<TimestampMs>,
    events_written: u64,
    out_of_order: u64,
}

impl EventWriter {
    /// A log of every tick, for calibration capture.
    pub fn raw(path: PathBuf, header: &EventStreamHeader) -> WheelguardResult<Self> {
        Self::create(path, header, LogContents::Raw)
    }

    /// A log of passed ticks only, for replay output.
    pub fn passed(path: PathBuf, header: &EventStreamHeader) -> WheelguardResult<Self> {
        Self::create(path, header, LogContents::Passed)
    }

    pub fn create(
        path: PathBuf,
        header: &EventStreamHeader,
        contents: LogContents,
    ) -> WheelguardResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut out = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(out, "# {header_json}").map_err(|e| {
            WheelguardError::hook(format!("failed to write header to {}: {e}", path.display()))
        })?;

        Ok(Self {
            out,
            path,
            contents,
            last_ms: None,
            events_written: 0,
            out_of_order: 0,
        })
    }

    /// Append one tick. A tick older than the previous one is skipped, since
    /// replay would read it as a clock anomaly; returns whether it was written.
    pub fn write_event(&mut self, event: &ScrollEvent) -> WheelguardResult<bool> {
        if self.last_ms.is_some_and(|last| event.timestamp_ms < last) {
            self.out_of_order += 1;
            tracing::warn!(
                t = event.timestamp_ms,
                last = ?self.last_ms,
                path = %self.path.display(),
                "Out-of-order tick not logged"
            );
            return Ok(false);
        }

        let json = serde_json::to_string(event)?;
        writeln!(self.out, "{json}")
            .map_err(|e| WheelguardError::hook(format!("failed to write tick: {e}")))?;
        self.last_ms = Some(event.timestamp_ms);
        self.events_written += 1;

        if self.events_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(true)
    }

    pub fn flush(&mut self) -> WheelguardResult<()> {
        self.out
            .flush()
            .map_err(|e| WheelguardError::hook(format!("failed to flush {}: {e}", self.path.display())))
    }

    pub fn contents(&self) -> LogContents {
        self.contents
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    /// Ticks skipped for going back in time.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DecisionSink for EventWriter {
    fn deliver(&mut self, event: &ScrollEvent, decision: Decision) -> WheelguardResult<()> {
        match (self.contents, decision) {
            (LogContents::Passed, Decision::Block) => Ok(()),
            _ => self.write_event(event).map(|_| ()),
        }
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelguard_scroll_model::parse_events;

    fn header() -> EventStreamHeader {
        EventStreamHeader {
            schema_version: LOG_SCHEMA_VERSION.to_string(),
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            source: "stub".to_string(),
            device: None,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_raw_log_parses_back_with_header() {
        let dir = scratch("wheelguard_test_writer_raw");
        let path = dir.join("wheel.jsonl");
        {
            let mut writer = EventWriter::raw(path.clone(), &header()).unwrap();
            writer.write_event(&ScrollEvent::down(0)).unwrap();
            writer.write_event(&ScrollEvent::down(35)).unwrap();
            writer.write_event(&ScrollEvent::up(70)).unwrap();
            assert_eq!(writer.events_written(), 3);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let first = content.lines().next().unwrap();
        let header: EventStreamHeader = serde_json::from_str(&first[2..]).unwrap();
        assert_eq!(header.source, "stub");
        assert_eq!(
            parse_events(&content).unwrap(),
            vec![
                ScrollEvent::down(0),
                ScrollEvent::down(35),
                ScrollEvent::up(70)
            ]
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_order_ticks_are_skipped() {
        let dir = scratch("wheelguard_test_writer_order");
        let path = dir.join("wheel.jsonl");
        {
            let mut writer = EventWriter::raw(path.clone(), &header()).unwrap();
            assert!(writer.write_event(&ScrollEvent::down(100)).unwrap());
            assert!(!writer.write_event(&ScrollEvent::down(90)).unwrap());
            assert!(writer.write_event(&ScrollEvent::down(100)).unwrap());
            assert!(writer.write_event(&ScrollEvent::up(140)).unwrap());
            assert_eq!(writer.out_of_order(), 1);
            assert_eq!(writer.events_written(), 3);
        }

        let events = parse_events(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(events.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_passed_log_skips_blocked_ticks() {
        let dir = scratch("wheelguard_test_writer_passed");
        let path = dir.join("filtered.jsonl");
        {
            let mut sink = EventWriter::passed(path.clone(), &header()).unwrap();
            sink.deliver(&ScrollEvent::down(0), Decision::Pass).unwrap();
            sink.deliver(&ScrollEvent::up(40), Decision::Block).unwrap();
            sink.deliver(&ScrollEvent::down(80), Decision::Pass).unwrap();
        }

        let events = parse_events(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(events, vec![ScrollEvent::down(0), ScrollEvent::down(80)]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_raw_log_as_sink_keeps_blocked_ticks() {
        let dir = scratch("wheelguard_test_writer_raw_sink");
        let path = dir.join("all.jsonl");
        {
            let mut sink = EventWriter::raw(path.clone(), &header()).unwrap();
            sink.deliver(&ScrollEvent::down(0), Decision::Pass).unwrap();
            sink.deliver(&ScrollEvent::up(40), Decision::Block).unwrap();
        }

        let events = parse_events(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(events.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
