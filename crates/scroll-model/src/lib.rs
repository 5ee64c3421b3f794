//! Wheelguard Scroll Model
//!
//! Defines the core data contracts shared by the filter, the calibration
//! engine, and the hosts that drive them:
//! - **Events:** Timestamped wheel ticks and the raw JSONL log format
//! - **Config:** The immutable filter configuration snapshot
//! - **Profiles:** Blacklist and per-application overrides
//! - **Calibration:** Recorded per-phase sample sets

pub mod calibration;
pub mod config;
pub mod event;
pub mod profile;

pub use calibration::*;
pub use config::*;
pub use event::*;
pub use profile::*;
