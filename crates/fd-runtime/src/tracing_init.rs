use std::fmt::{self as stdfmt, Write as _};
use std::path::Path;

use anyhow::Result;
use fd_config::{LogFormat, LoggingConfig};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ---------------------------------------------------------------------------
// DomainFormat
// ---------------------------------------------------------------------------

/// Plain-text event formatter that lifts the `domain` field into a
/// `[domain]` prefix:
///
/// ```text
/// 2026-03-02T10:04:11.512Z  INFO [sys] engine started partitions=4
/// ```
///
/// Events without a domain (dependencies, the `log` bridge) print without a
/// prefix.
pub struct DomainFormat {
    timer: SystemTime,
}

impl DomainFormat {
    pub fn new() -> Self {
        Self { timer: SystemTime }
    }
}

impl Default for DomainFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for DomainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let ansi = writer.has_ansi_escapes();
        if self.timer.format_time(&mut writer).is_err() {
            writer.write_str("<unknown time>")?;
        }

        let level = *event.metadata().level();
        if ansi {
            write!(writer, " \x1b[{}m{level:>5}\x1b[0m ", level_color(level))?;
        } else {
            write!(writer, " {level:>5} ")?;
        }

        let mut fields = FieldSplitter::default();
        event.record(&mut fields);

        match (&fields.domain, ansi) {
            (Some(domain), true) => write!(writer, "\x1b[1;36m[{domain}]\x1b[0m ")?,
            (Some(domain), false) => write!(writer, "[{domain}] ")?,
            (None, _) => write!(writer, "{}: ", event.metadata().target())?,
        }
        writer.write_str(&fields.message)?;
        if !fields.rest.is_empty() {
            write!(writer, " {}", fields.rest)?;
        }
        writeln!(writer)
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "31",
        Level::WARN => "33",
        Level::INFO => "32",
        Level::DEBUG => "34",
        Level::TRACE => "35",
    }
}

/// Separates `domain` and `message` from the remaining event fields.
#[derive(Default)]
struct FieldSplitter {
    domain: Option<String>,
    message: String,
    rest: String,
}

impl FieldSplitter {
    fn push(&mut self, name: &str, value: stdfmt::Arguments<'_>) {
        if !self.rest.is_empty() {
            self.rest.push(' ');
        }
        write!(&mut self.rest, "{name}={value}").ok();
    }
}

impl Visit for FieldSplitter {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "domain" => self.domain = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.push(name, format_args!("{value:?}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        match field.name() {
            "domain" => self.domain = Some(format!("{value:?}").trim_matches('"').to_string()),
            "message" => {
                write!(&mut self.message, "{value:?}").ok();
            }
            name => self.push(name, format_args!("{value:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// init_tracing
// ---------------------------------------------------------------------------

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, replaces the configured directives. Relative log
/// file paths resolve against `base_dir`. The returned guard owns the
/// non-blocking file writer and must live until exit.
///
/// Records emitted through the `log` facade (as `fd-core` does) are bridged
/// by `tracing-subscriber`'s `tracing-log` feature.
pub fn init_tracing(config: &LoggingConfig, base_dir: &Path) -> Result<Option<WorkerGuard>> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => {
            let directives = config.directives();
            EnvFilter::try_new(&directives)
                .map_err(|e| anyhow::anyhow!("invalid log filter '{directives}': {e}"))?
        }
    };
    let json = config.format == LogFormat::Json;

    let mut layers: Vec<BoxedLayer> = vec![stream_layer(json, std::io::stderr, true)];
    let mut guard = None;

    if let Some(file) = &config.file {
        let path = if file.is_relative() {
            base_dir.join(file)
        } else {
            file.clone()
        };
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("log file {} has no parent directory", path.display()))?;
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("log file {} has no file name", path.display()))?;
        std::fs::create_dir_all(dir)?;

        let (writer, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        guard = Some(file_guard);
        layers.push(stream_layer(json, writer, false));
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing already initialised: {e}"))?;
    Ok(guard)
}

fn stream_layer<W>(json: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer()
            .json()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .event_format(DomainFormat::new())
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'w> fmt::MakeWriter<'w> for Capture {
        type Writer = Capture;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn domain_becomes_prefix() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(stream_layer(false, capture.clone(), false));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(domain = "sys", partitions = 4u64, "engine started");
        });
        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains(" INFO [sys] engine started partitions=4"), "{out}");
    }
}
