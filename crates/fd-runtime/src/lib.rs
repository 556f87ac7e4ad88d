#[macro_use]
mod log_macros;

pub mod error;
mod latency_task;
pub mod lifecycle;
pub mod metrics;
mod output_task;
mod partition;
pub mod router;
pub mod source;
pub mod tracing_init;
