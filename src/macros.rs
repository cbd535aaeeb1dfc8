//! Internal macros.

/// Emits a `tracing` trace event when the `tracing` feature is enabled.
///
/// Without the feature the arguments are not evaluated.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($($argument:tt)*) => {
        ::tracing::trace!($($argument)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($($argument:tt)*) => {};
}
