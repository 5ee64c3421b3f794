//! Wheelguard Filter Core
//!
//! Decides, tick by tick, whether a mouse-wheel event is a deliberate scroll
//! or encoder bounce:
//! - **Engine:** the pass/block state machine over one scroll session
//! - **Momentum:** scales the reversal threshold while the wheel spins fast
//! - **Resolver:** picks the configuration snapshot for the foreground app
//! - **Shared config:** snapshot publication between UI and hook threads
//! - **Guard:** the fail-open boundary the hook calls
//!
//! Nothing here blocks or performs I/O. Diagnostics leave through a
//! non-blocking sink.

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod guard;
pub mod momentum;
pub mod resolver;
pub mod session;
pub mod shared;

pub use diagnostics::{
    ChannelDiagnostics, DiagnosticRecord, DiagnosticsSink, NullDiagnostics, TracingDiagnostics,
};
pub use engine::{decide, step, Decision, Reason, Verdict};
pub use error::FilterFault;
pub use guard::{FilterStats, HookFilter};
pub use resolver::{ConfigResolver, ConfigSet, ProfileKey, Resolved};
pub use session::{ResetCause, SessionState};
pub use shared::{SharedConfig, Snapshot};
