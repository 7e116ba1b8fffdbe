//! Tracing hooks for search execution.
//!
//! Events and spans use the target "colfilter" and carry a `component` field naming
//! the storage layer. The crate never installs a subscriber; applications choose one.

/// Target for all events and spans emitted by this crate.
pub(crate) const TARGET: &str = "colfilter";

/// Trace-level event.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::TARGET, $($field)*)
    };
}

/// Debug-level event.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::TARGET, $($field)*)
    };
}

/// Enters a trace-level span covering one search call; the span closes when the guard drops.
///
/// ```ignore
/// let _span = search_span!("dense_null_overlay::search", op);
/// ```
macro_rules! search_span {
    ($name:literal, $op:expr) => {
        ::tracing::trace_span!(target: $crate::observability::TARGET, $name, op = ?$op).entered()
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
pub(crate) use search_span;
