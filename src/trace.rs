//! Optional structured logging for pool lifecycle and worker events.
//!
//! Enable with `--features tracing`. All macros become no-ops when the
//! feature is disabled, so the hot paths carry zero logging overhead by
//! default.

/// Install a subscriber printing pool events with thread names and uptime
/// stamps. Honors `RUST_LOG`; defaults to everything from this crate.
///
/// Call once at the start of a test or binary. A no-op without the
/// `tracing` feature.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskpool_rs=trace"));

    let events = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry().with(events).with(filter).init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

// With the feature on, the macros are the real ones from `tracing`.
#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, trace};

// With the feature off, same names, empty expansions.
#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! error_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use error_noop as error;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
