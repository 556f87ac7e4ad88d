mod sink;
mod types;

pub use sink::{FanOutSink, FileSink, RecordSink, StdoutSink, encode_record};
pub use types::{Alert, format_millis_utc};
