pub mod engine;
pub mod fraud;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod types;
mod validate;

pub use engine::EngineConfig;
pub use fraud::FraudConfig;
pub use input::{InputConfig, InputSource};
pub use logging::{LogFormat, LoggingConfig};
pub use metrics::MetricsConfig;
pub use output::{OutputConfig, SinkUri, parse_sink_uri};
pub use types::HumanDuration;
