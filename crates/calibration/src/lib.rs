//! Wheelguard Calibration
//!
//! Turns a guided scrolling session into a recommended filter configuration:
//! - **Recorder:** collects ticks per phase; cancelled phases leave no trace
//! - **Stats:** nearest-rank percentiles over raw gap lists
//! - **Analyzer:** derives each parameter from its phase, with provenance

pub mod analyze;
pub mod recorder;
pub mod stats;

pub use analyze::{
    analyze, CalibrationAnalyzer, CalibrationReport, Parameter, Provenance, MIN_SAMPLES,
};
pub use recorder::CalibrationRecorder;
