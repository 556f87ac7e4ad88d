//! Domain-tagged logging macros.
//!
//! Every macro injects a `domain` field so log consumers can filter by
//! subsystem: `sys` (lifecycle), `pipe` (input, routing, evaluation), `res`
//! (state, eviction, metrics) and `conf` (configuration).
//!
//! ```ignore
//! fd_info!(sys, partitions = 4, "engine started");
//! fd_warn!(pipe, line = 12, error = %e, "skipping malformed input line");
//! ```
//!
//! The domain is a bare identifier, not a string literal.

#[doc(hidden)]
macro_rules! fd_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! fd_error {
    ($domain:ident, $($rest:tt)*) => {
        fd_log!(error, $domain, $($rest)*)
    };
}

macro_rules! fd_warn {
    ($domain:ident, $($rest:tt)*) => {
        fd_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! fd_info {
    ($domain:ident, $($rest:tt)*) => {
        fd_log!(info, $domain, $($rest)*)
    };
}

macro_rules! fd_debug {
    ($domain:ident, $($rest:tt)*) => {
        fd_log!(debug, $domain, $($rest)*)
    };
}

#[allow(unused_macros)]
macro_rules! fd_trace {
    ($domain:ident, $($rest:tt)*) => {
        fd_log!(trace, $domain, $($rest)*)
    };
}
