//! Linux evdev wheel source.
//!
//! Reads `REL_WHEEL` from a `/dev/input/event*` node opened non-blocking.
//! Kernel event times are mapped onto the hook clock so gaps reflect when the
//! encoder fired, not when the event was read.

use std::collections::VecDeque;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use evdev::{Device, InputEventKind, RelativeAxisType};
use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_common::HookClock;
use wheelguard_scroll_model::{ScrollDirection, ScrollEvent, TimestampMs};

use crate::WheelSource;

/// An input device that reports a scroll wheel.
#[derive(Debug, Clone)]
pub struct WheelDevice {
    pub path: PathBuf,
    pub name: String,
}

/// List devices exposing `REL_WHEEL`.
pub fn list_wheel_devices() -> Vec<WheelDevice> {
    evdev::enumerate()
        .filter(|(_, device)| has_wheel(device))
        .map(|(path, device)| WheelDevice {
            name: device.name().unwrap_or("unnamed device").to_string(),
            path,
        })
        .collect()
}

fn has_wheel(device: &Device) -> bool {
    device
        .supported_relative_axes()
        .is_some_and(|axes| axes.contains(RelativeAxisType::REL_WHEEL))
}

pub struct EvdevWheelSource {
    device: Device,
    label: String,
    /// Hook-clock time and system time sampled together at open.
    anchor_ms: TimestampMs,
    anchor_system: SystemTime,
    /// Latest timestamp handed out; later ticks never go below it.
    last_ms: TimestampMs,
    pending: VecDeque<ScrollEvent>,
}

impl EvdevWheelSource {
    pub fn open(path: &Path, clock: HookClock) -> WheelguardResult<Self> {
        let device = Device::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => WheelguardError::permission_denied(format!(
                "cannot open {}: {e}; add your user to the 'input' group",
                path.display()
            )),
            _ => WheelguardError::hook(format!("failed to open {}: {e}", path.display())),
        })?;

        if !has_wheel(&device) {
            return Err(WheelguardError::hook(format!(
                "{} does not report a scroll wheel",
                path.display()
            )));
        }
        set_nonblocking(&device)
            .map_err(|e| WheelguardError::hook(format!("failed to set O_NONBLOCK: {e}")))?;

        let label = format!(
            "{} ({})",
            device.name().unwrap_or("unnamed device"),
            path.display()
        );
        let anchor_ms = clock.now_ms();
        Ok(Self {
            device,
            label,
            anchor_ms,
            anchor_system: SystemTime::now(),
            last_ms: anchor_ms,
            pending: VecDeque::new(),
        })
    }

    /// Open the first device that reports a wheel.
    pub fn first_wheel(clock: HookClock) -> WheelguardResult<Self> {
        let Some(found) = list_wheel_devices().into_iter().next() else {
            return Err(WheelguardError::hook(
                "no readable input device reports a scroll wheel",
            ));
        };
        Self::open(&found.path, clock)
    }

    fn to_hook_ms(&mut self, at: SystemTime) -> TimestampMs {
        let mapped = kernel_to_hook_ms(self.anchor_ms, self.anchor_system, at);
        self.last_ms = self.last_ms.max(mapped);
        self.last_ms
    }

    fn ingest(&mut self) -> WheelguardResult<()> {
        let events: Vec<(SystemTime, i32)> = match self.device.fetch_events() {
            Ok(events) => events
                .filter(|e| {
                    matches!(e.kind(), InputEventKind::RelAxis(axis) if axis == RelativeAxisType::REL_WHEEL)
                })
                .map(|e| (e.timestamp(), e.value()))
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
            Err(err) => {
                return Err(WheelguardError::hook(format!(
                    "failed reading {}: {err}",
                    self.label
                )));
            }
        };

        for (at, delta) in events {
            let Some(direction) = ScrollDirection::from_delta(delta) else {
                continue;
            };
            let timestamp_ms = self.to_hook_ms(at);
            // One report per notch; a multi-notch delta becomes several ticks.
            for _ in 0..delta.unsigned_abs() {
                self.pending
                    .push_back(ScrollEvent::new(direction, timestamp_ms));
            }
        }
        Ok(())
    }
}

impl WheelSource for EvdevWheelSource {
    fn poll(&mut self) -> WheelguardResult<Option<ScrollEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        self.ingest()?;
        Ok(self.pending.pop_front())
    }

    fn name(&self) -> &str {
        "evdev"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn device(&self) -> Option<&str> {
        Some(&self.label)
    }
}

/// Map a kernel event time onto the hook clock. Times before the anchor
/// (queued before open, or a wall clock step back) clamp to the anchor.
fn kernel_to_hook_ms(
    anchor_ms: TimestampMs,
    anchor_system: SystemTime,
    at: SystemTime,
) -> TimestampMs {
    match at.duration_since(anchor_system) {
        Ok(since) => anchor_ms + since.as_millis() as u64,
        Err(_) => anchor_ms,
    }
}

fn set_nonblocking(device: &Device) -> std::io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd is owned by `device` and stays open for the duration.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above; only the O_NONBLOCK status flag changes.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Explain why `/dev/input` could not be used.
pub(crate) fn input_access_diagnostic() -> String {
    let path = "/dev/input/event0";
    let uid = unsafe { libc::geteuid() };
    let gid = unsafe { libc::getegid() };

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mode = meta.mode() & 0o777;
            let owner = meta.uid();
            let group = meta.gid();
            format!(
                "device={path} mode={mode:o} owner_uid={owner} owner_gid={group} process_uid={uid} process_gid={gid}; likely missing 'input' group membership. Fix: sudo usermod -aG input $USER && log out/in"
            )
        }
        Err(err) => format!(
            "device={path} unavailable ({err}); ensure kernel input devices exist and permissions allow read access"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kernel_time_maps_relative_to_anchor() {
        let anchor = SystemTime::now();
        assert_eq!(kernel_to_hook_ms(500, anchor, anchor), 500);
        assert_eq!(
            kernel_to_hook_ms(500, anchor, anchor + Duration::from_millis(42)),
            542
        );
    }

    #[test]
    fn test_kernel_time_before_anchor_clamps() {
        let anchor = SystemTime::now();
        let early = anchor - Duration::from_secs(3);
        assert_eq!(kernel_to_hook_ms(500, anchor, early), 500);
    }
}
