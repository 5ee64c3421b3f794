//! Wheelguard Common Utilities
//!
//! Shared infrastructure for all Wheelguard crates:
//! - Error types and result aliases
//! - Monotonic hook clock
//! - Tracing/logging initialization
//! - Configuration loading and atomic saving

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
