//! Internal faults caught at the hook boundary.

/// A failure inside the decision path. Never escapes [`crate::HookFilter`];
/// the event is passed and the fault reported to diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterFault {
    #[error("session state corrupted: {0}")]
    CorruptSession(&'static str),

    #[error("decision panicked: {0}")]
    Panic(String),
}
